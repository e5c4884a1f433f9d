//! The HTTP seam under the request pipeline.
//!
//! [`Transport`] sends one fully described request and returns the raw
//! response, status and body intact. It knows nothing about sessions or
//! retries; the pipeline decides which bearer credential to pass.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::error::Result;

/// A request description that can be sent more than once.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response as received, before any interpretation.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as lossy UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, attaching `bearer` as the Authorization header if given.
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse>;
}

/// [`Transport`] over a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request, bearer), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Response received");

        Ok(ApiResponse { status, body })
    }
}
