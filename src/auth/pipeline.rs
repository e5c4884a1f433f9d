//! Authenticated request pipeline.
//!
//! Every backend call goes through [`Pipeline::send`], which runs two stages:
//!
//! 1. **Outbound** ([`Pipeline::attach_credential`]): read the current access
//!    credential from the session and attach it as a bearer token. Never
//!    blocks, never fails; with no credential the call goes out
//!    unauthenticated.
//! 2. **Inbound** ([`Pipeline::handle_response`]): anything other than 401
//!    is delivered unchanged. A 401 on the first attempt with a refresh
//!    credential available triggers the refresh protocol and one retry.
//!    Every other 401 is rejected as [`Error::Unauthorized`].
//!
//! # Liveness
//!
//! The retry marker is the [`Attempt`] value threaded through the dispatch
//! loop, so a logical request performs at most one refresh no matter how
//! many 401s it receives.
//!
//! # Concurrency
//!
//! Concurrent 401s share a single in-flight refresh. The first caller starts
//! it; later callers await the same [`Shared`] future. A 401 for a request
//! that went out with an access credential that has since been replaced is
//! retried with the current credential without refreshing again. The
//! refresh call is bounded by a timeout so a hung refresh cannot stall
//! every later 401.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use super::error::{Error, Result};
use super::refresh::RefreshProtocol;
use super::session::SessionState;
use super::transport::{ApiRequest, ApiResponse, Transport};

/// Default bound on a single refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Which attempt of a logical request a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First dispatch; a 401 may still be recovered.
    Initial,
    /// Already retried after a refresh; a 401 is final.
    Retried,
}

/// Decision of the inbound stage.
#[derive(Debug)]
pub enum Inbound {
    /// Hand the response to the caller as is.
    Deliver(ApiResponse),
    /// A fresh access credential is available; dispatch again.
    Retry,
    /// Authentication cannot be recovered for this request.
    Reject,
}

type RefreshOutcome = std::result::Result<String, Arc<Error>>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;
type RefreshSlot = Mutex<Option<SharedRefresh>>;

struct Inner {
    transport: Arc<dyn Transport>,
    refresher: Arc<dyn RefreshProtocol>,
    session: SessionState,
    refresh_timeout: Duration,
    in_flight: Arc<RefreshSlot>,
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    session: SessionState,
    transport: Option<Arc<dyn Transport>>,
    refresher: Option<Arc<dyn RefreshProtocol>>,
    refresh_timeout: Duration,
}

impl PipelineBuilder {
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn refresher(mut self, refresher: Arc<dyn RefreshProtocol>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    #[must_use]
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let transport = self
            .transport
            .ok_or_else(|| Error::config("Pipeline requires a transport"))?;
        let refresher = self
            .refresher
            .ok_or_else(|| Error::config("Pipeline requires a refresh protocol"))?;

        Ok(Pipeline {
            inner: Arc::new(Inner {
                transport,
                refresher,
                session: self.session,
                refresh_timeout: self.refresh_timeout,
                in_flight: Arc::new(Mutex::new(None)),
            }),
        })
    }
}

/// The request pipeline. Cheap to clone; clones share the refresh slot.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    pub fn builder(session: SessionState) -> PipelineBuilder {
        PipelineBuilder {
            session,
            transport: None,
            refresher: None,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.inner.session
    }

    /// Outbound stage: the bearer credential for the next dispatch.
    pub fn attach_credential(&self) -> Option<String> {
        self.inner.session.access_token()
    }

    /// Send a request, resolving at most one authentication failure.
    ///
    /// Returns every non-401 response unchanged, including 4xx and 5xx.
    /// Fails with [`Error::Unauthorized`] when a 401 cannot be recovered
    /// and with a network error when the transport fails.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut attempt = Attempt::Initial;
        loop {
            let bearer = self.attach_credential();
            let response = self
                .inner
                .transport
                .send(&request, bearer.as_deref())
                .await?;

            match self.handle_response(response, attempt, bearer.as_deref()).await {
                Inbound::Deliver(response) => return Ok(response),
                Inbound::Retry => {
                    debug!("Retrying with refreshed credential");
                    attempt = Attempt::Retried;
                }
                Inbound::Reject => return Err(Error::Unauthorized),
            }
        }
    }

    /// Inbound stage.
    ///
    /// `sent_with` is the bearer the response answered, used to tell a
    /// stale credential from one that needs refreshing.
    pub async fn handle_response(
        &self,
        response: ApiResponse,
        attempt: Attempt,
        sent_with: Option<&str>,
    ) -> Inbound {
        if response.status != StatusCode::UNAUTHORIZED {
            return Inbound::Deliver(response);
        }

        if attempt == Attempt::Retried {
            warn!("Request rejected again after refresh");
            return Inbound::Reject;
        }

        if self.inner.session.refresh_token().is_none() {
            debug!("401 without a refresh credential");
            return Inbound::Reject;
        }

        match self.refresh_once(sent_with).await {
            Ok(_) => Inbound::Retry,
            Err(e) => {
                debug!(error = %e, "Refresh did not produce a credential");
                Inbound::Reject
            }
        }
    }

    /// Join the in-flight refresh, or start one.
    ///
    /// The stale-credential check runs under the slot lock. A finished
    /// refresh publishes the new credential before it empties the slot, so
    /// an empty slot with a matching credential really needs a refresh.
    async fn refresh_once(&self, rejected: Option<&str>) -> RefreshOutcome {
        let pending = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining in-flight refresh");
                    pending.clone()
                }
                None => {
                    if let Some(current) = self.inner.session.access_token() {
                        if rejected != Some(current.as_str()) {
                            debug!("Credential already replaced, skipping refresh");
                            return Ok(current);
                        }
                    }
                    let pending = self.start_refresh();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    fn start_refresh(&self) -> SharedRefresh {
        let session = self.inner.session.clone();
        let refresher = Arc::clone(&self.inner.refresher);
        let timeout = self.inner.refresh_timeout;
        let slot: Weak<RefreshSlot> = Arc::downgrade(&self.inner.in_flight);

        async move {
            let outcome = run_refresh(session, refresher, timeout).await;
            if let Some(slot) = slot.upgrade() {
                slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("session", &self.inner.session)
            .field("refresh_timeout", &self.inner.refresh_timeout)
            .finish()
    }
}

/// One refresh exchange. Clears the session if it fails, unless a newer
/// sign-in replaced the pair in the meantime.
async fn run_refresh(
    session: SessionState,
    refresher: Arc<dyn RefreshProtocol>,
    timeout: Duration,
) -> RefreshOutcome {
    let Some(refresh_token) = session.refresh_token() else {
        return Err(Arc::new(Error::Unauthorized));
    };

    let result = match tokio::time::timeout(timeout, refresher.refresh(&refresh_token)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Refresh call timed out");
            Err(Error::Timeout)
        }
    };

    match result {
        Ok(token) => match session
            .replace_access(&refresh_token, token.access, token.refresh)
            .await
        {
            Ok(pair) => {
                info!("Session refreshed");
                Ok(pair.access)
            }
            Err(e) => Err(Arc::new(e)),
        },
        Err(e) => {
            if !session.invalidate_if(&refresh_token, &e.to_string()).await {
                if let Some(current) = session.access_token() {
                    debug!(error = %e, "Refresh failed for a replaced pair, retrying with current");
                    return Ok(current);
                }
            }
            Err(Arc::new(e))
        }
    }
}
