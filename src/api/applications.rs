//! Job application endpoints.

use reqwest::Method;
use tracing::{info, instrument};
use url::Url;

use super::client::ApiClient;
use super::models::{ApplicationPatch, ApplicationStatus, JobApplication, NewApplication, Page};
use super::signal::RefreshSignal;
use crate::auth::Result;

const APPLICATIONS_PATH: &str = "api/applications/";

/// Filters for the application list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<ApplicationStatus>,
    pub page_size: Option<u32>,
    pub page: Option<u32>,
}

impl ListQuery {
    pub fn status(mut self, status: ApplicationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    fn apply(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        if let Some(status) = self.status {
            pairs.append_pair("status", status.as_str());
        }
        if let Some(page_size) = self.page_size {
            pairs.append_pair("page_size", &page_size.to_string());
        }
        if let Some(page) = self.page {
            pairs.append_pair("page", &page.to_string());
        }
    }
}

/// CRUD and status workflow for job applications.
#[derive(Debug, Clone)]
pub struct ApplicationsApi {
    client: ApiClient,
    signal: RefreshSignal,
}

impl ApplicationsApi {
    pub fn new(client: ApiClient, signal: RefreshSignal) -> Self {
        Self { client, signal }
    }

    pub fn signal(&self) -> &RefreshSignal {
        &self.signal
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<JobApplication>> {
        let mut url = self.client.endpoint(APPLICATIONS_PATH)?;
        query.apply(&mut url);
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.client.request(Method::GET, url, None).await
    }

    /// Follow the page's `next` link. `None` on the last page.
    pub async fn next_page(
        &self,
        page: &Page<JobApplication>,
    ) -> Result<Option<Page<JobApplication>>> {
        self.follow(page.next.as_deref()).await
    }

    /// Follow the page's `previous` link. `None` on the first page.
    pub async fn previous_page(
        &self,
        page: &Page<JobApplication>,
    ) -> Result<Option<Page<JobApplication>>> {
        self.follow(page.previous.as_deref()).await
    }

    /// Every application matching `query`, walking all pages.
    pub async fn list_all(&self, query: &ListQuery) -> Result<Vec<JobApplication>> {
        let mut page = self.list(query).await?;
        let mut all = std::mem::take(&mut page.results);
        while let Some(mut next) = self.next_page(&page).await? {
            all.append(&mut next.results);
            page = next;
        }
        Ok(all)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: u64) -> Result<JobApplication> {
        let url = self.detail_url(id)?;
        self.client.request(Method::GET, url, None).await
    }

    #[instrument(skip(self, application), fields(company = %application.company_name))]
    pub async fn create(&self, application: &NewApplication) -> Result<JobApplication> {
        let url = self.client.endpoint(APPLICATIONS_PATH)?;
        let body = ApiClient::to_body(application)?;
        let created: JobApplication = self.client.request(Method::POST, url, Some(body)).await?;
        info!(id = created.id, "Application created");
        self.signal.bump();
        Ok(created)
    }

    /// Partial update; only the fields set in `patch` are sent.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: u64, patch: &ApplicationPatch) -> Result<JobApplication> {
        let url = self.detail_url(id)?;
        let body = ApiClient::to_body(patch)?;
        let updated = self.client.request(Method::PATCH, url, Some(body)).await?;
        self.signal.bump();
        Ok(updated)
    }

    /// Move an application to `status`. The server records the audit entry.
    pub async fn change_status(
        &self,
        id: u64,
        status: ApplicationStatus,
    ) -> Result<JobApplication> {
        self.update(id, &ApplicationPatch::status(status)).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<()> {
        let url = self.detail_url(id)?;
        self.client.request_empty(Method::DELETE, url, None).await?;
        info!(id, "Application deleted");
        self.signal.bump();
        Ok(())
    }

    /// Clear the server-side follow-up flag.
    #[instrument(skip(self))]
    pub async fn acknowledge_followup(&self, id: u64) -> Result<()> {
        let url = self
            .client
            .endpoint(&format!("{APPLICATIONS_PATH}{id}/acknowledge_followup/"))?;
        self.client.request_empty(Method::POST, url, None).await?;
        self.signal.bump();
        Ok(())
    }

    fn detail_url(&self, id: u64) -> Result<Url> {
        self.client.endpoint(&format!("{APPLICATIONS_PATH}{id}/"))
    }

    async fn follow(&self, link: Option<&str>) -> Result<Option<Page<JobApplication>>> {
        let Some(link) = link else {
            return Ok(None);
        };
        let url = Url::parse(link)?;
        let page = self.client.request(Method::GET, url, None).await?;
        Ok(Some(page))
    }
}
