//! Refresh protocol: exchange a refresh credential for a new access credential.
//!
//! The backend contract is `POST <refresh url>` with `{"refresh": "..."}`.
//! A 2xx answer carries `{"access": "..."}` and, when the server rotates
//! refresh credentials, a new `"refresh"` as well. Anything else means the
//! refresh credential is no longer usable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::{Error, Result};
use super::token::mask_token;

/// A successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedToken {
    pub access: String,
    /// Present only when the server rotated the refresh credential.
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Exchanges refresh credentials. Injected into the pipeline so tests can
/// count and script refresh calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshProtocol: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken>;
}

/// [`RefreshProtocol`] against the backend's token refresh endpoint.
#[derive(Debug, Clone)]
pub struct HttpRefresher {
    client: reqwest::Client,
    refresh_url: Url,
}

impl HttpRefresher {
    pub fn new(client: reqwest::Client, refresh_url: Url) -> Self {
        Self {
            client,
            refresh_url,
        }
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

#[async_trait]
impl RefreshProtocol for HttpRefresher {
    #[instrument(skip(self, refresh_token), fields(url = %self.refresh_url))]
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken> {
        debug!(token_preview = %mask_token(refresh_token), "Refreshing access credential");

        let response = self
            .client
            .post(self.refresh_url.clone())
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = %status, "Refresh credential rejected");
            return Err(Error::refresh_failed(format!("{status}: {message}")));
        }

        let token: RefreshedToken = response
            .json()
            .await
            .map_err(|e| Error::refresh_failed(format!("Malformed refresh response: {e}")))?;
        if token.access.trim().is_empty() {
            return Err(Error::refresh_failed("Refresh response has an empty access credential"));
        }

        info!(
            rotated = token.refresh.is_some(),
            token_preview = %mask_token(&token.access),
            "Access credential refreshed"
        );
        Ok(token)
    }
}
