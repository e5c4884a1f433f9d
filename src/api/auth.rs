//! Social sign-in: trade a provider access token for a backend credential pair.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use super::client::classify;
use crate::auth::{ApiRequest, CredentialPair, Error, Result, SessionState, Transport};

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    #[serde(alias = "access_token")]
    access: Option<String>,
    #[serde(alias = "refresh_token")]
    refresh: Option<String>,
}

/// Sign-in against the backend's social login endpoint.
///
/// The exchange goes straight to the transport: no bearer is attached and a
/// 401 is never refreshed.
#[derive(Clone)]
pub struct SocialLoginApi {
    transport: Arc<dyn Transport>,
    session: SessionState,
    url: Url,
}

impl SocialLoginApi {
    pub fn new(transport: Arc<dyn Transport>, session: SessionState, url: Url) -> Self {
        Self {
            transport,
            session,
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Exchange `provider_token` and sign the session in with the result.
    #[instrument(skip(self, provider_token), fields(url = %self.url))]
    pub async fn exchange(&self, provider_token: &str) -> Result<CredentialPair> {
        if provider_token.trim().is_empty() {
            return Err(Error::InvalidCredentials(
                "provider token is empty".to_string(),
            ));
        }

        let body = serde_json::to_value(ExchangeRequest {
            access_token: provider_token,
        })?;
        let request = ApiRequest::new(reqwest::Method::POST, self.url.clone()).with_json(body);
        let response = self.transport.send(&request, None).await?;

        if response.status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        let response = classify(response)?;

        let tokens: ExchangeResponse = response.json()?;
        let pair = CredentialPair::from_parts(tokens.access, tokens.refresh).ok_or_else(|| {
            Error::InvalidCredentials("sign-in response lacks a credential pair".to_string())
        })?;

        self.session
            .login(pair.access.clone(), pair.refresh.clone())
            .await?;
        info!(subject = ?pair.subject(), "Signed in through social login");
        Ok(pair)
    }
}

impl std::fmt::Debug for SocialLoginApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialLoginApi")
            .field("url", &self.url)
            .finish()
    }
}
