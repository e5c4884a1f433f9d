//! Dashboard aggregates.

use reqwest::Method;
use tracing::instrument;

use super::client::ApiClient;
use super::models::DashboardStats;
use crate::auth::Result;

const DASHBOARD_PATH: &str = "api/dashboard/";

#[derive(Debug, Clone)]
pub struct DashboardApi {
    client: ApiClient,
}

impl DashboardApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats> {
        let url = self.client.endpoint(DASHBOARD_PATH)?;
        self.client.request(Method::GET, url, None).await
    }
}
