//! Typed JSON calls over the request pipeline.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

use crate::auth::{ApiRequest, ApiResponse, Error, Pipeline, Result};

/// Backend client shared by the API consumers.
///
/// Owns nothing but a pipeline handle and the base URL, so it is cheap to
/// clone into each consumer.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pipeline: Pipeline,
    base_url: Url,
}

impl ApiClient {
    pub fn new(pipeline: Pipeline, base_url: Url) -> Self {
        Self {
            pipeline,
            base_url: with_trailing_slash(base_url),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request and decode a JSON answer.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let response = self.dispatch(method, url, body).await?;
        response.json()
    }

    /// Send a request whose answer carries no body of interest.
    pub(crate) async fn request_empty(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        self.dispatch(method, url, body).await.map(|_| ())
    }

    pub(crate) fn to_body<B: Serialize>(body: &B) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(body)?)
    }

    async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let mut request = ApiRequest::new(method, url);
        if let Some(body) = body {
            request = request.with_json(body);
        }
        let response = self.pipeline.send(request).await?;
        classify(response)
    }
}

/// Map a delivered response onto the error taxonomy.
///
/// 401s never reach this point; the pipeline has already resolved them.
pub(crate) fn classify(response: ApiResponse) -> Result<ApiResponse> {
    let status = response.status;
    if status.is_success() {
        return Ok(response);
    }

    if status.is_server_error() {
        let message = response.text();
        error!(status = status.as_u16(), message = %message, "Backend error");
        return Err(Error::Server {
            status: status.as_u16(),
            message,
        });
    }

    let body = serde_json::from_slice(&response.body)
        .unwrap_or_else(|_| serde_json::Value::String(response.text()));
    debug!(status = status.as_u16(), "Request rejected by backend");
    Err(Error::Validation {
        status: status.as_u16(),
        body,
    })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
