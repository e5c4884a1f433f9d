//! Scripted fakes for the pipeline stages.
//!
//! [`FakeBackend`] plays both sides of the backend contract: it answers
//! resource calls through [`Transport`] and token refreshes through
//! [`RefreshProtocol`], sharing one set of valid credentials so tests can
//! expire and revoke them mid-scenario.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::json;

use crate::auth::{
    ApiRequest, ApiResponse, Error, RefreshProtocol, RefreshedToken, Result, Transport,
};

/// One call seen by the fake transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
}

#[derive(Debug, Default)]
struct BackendState {
    valid_access: HashSet<String>,
    valid_refresh: HashSet<String>,
    scripted: VecDeque<ApiResponse>,
    calls: Vec<RecordedCall>,
    issued: usize,
    rotate_refresh: bool,
    always_unauthorized: bool,
    hang_refresh: bool,
}

/// In-process stand-in for the job tracker backend.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
    refresh_calls: AtomicUsize,
    request_delay: Duration,
    refresh_delay: Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Scripting
    // ========================================================================

    pub fn accepting(self, access: &str, refresh: &str) -> Self {
        {
            let mut state = self.lock();
            state.valid_access.insert(access.to_string());
            state.valid_refresh.insert(refresh.to_string());
        }
        self
    }

    /// Accept `refresh` for refreshing while no access credential is valid.
    pub fn expired_access(self, refresh: &str) -> Self {
        self.lock().valid_refresh.insert(refresh.to_string());
        self
    }

    /// Issue a new refresh credential on every refresh.
    pub fn rotating(self) -> Self {
        self.lock().rotate_refresh = true;
        self
    }

    /// Reject every resource call with 401, even with a fresh credential.
    pub fn always_unauthorized(self) -> Self {
        self.lock().always_unauthorized = true;
        self
    }

    /// Never answer refresh calls.
    pub fn hanging_refresh(self) -> Self {
        self.lock().hang_refresh = true;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Answer the next authorized call with `response` instead of the default.
    pub fn push_response(&self, status: StatusCode, body: serde_json::Value) {
        self.lock()
            .scripted
            .push_back(ApiResponse::new(status, body.to_string()));
    }

    pub fn expire_access(&self) {
        self.lock().valid_access.clear();
    }

    pub fn revoke_refresh(&self) {
        self.lock().valid_refresh.clear();
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn bearers(&self) -> Vec<Option<String>> {
        self.lock().calls.iter().map(|c| c.bearer.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn default_body(method: &Method, path: &str) -> serde_json::Value {
        match (method.as_str(), path) {
            ("GET", "/api/applications/") => json!({
                "count": 0,
                "next": null,
                "previous": null,
                "results": []
            }),
            ("GET", "/api/dashboard/") => json!({"status_counts": [], "avg_days": []}),
            _ => json!({"ok": true, "path": path}),
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let mut state = self.lock();
        state.calls.push(RecordedCall {
            method: request.method.clone(),
            path: request.url.path().to_string(),
            bearer: bearer.map(str::to_string),
        });

        let authorized = !state.always_unauthorized
            && bearer.is_some_and(|token| state.valid_access.contains(token));
        if !authorized {
            return Ok(ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                json!({"detail": "Given token not valid for any token type"}).to_string(),
            ));
        }

        if let Some(scripted) = state.scripted.pop_front() {
            return Ok(scripted);
        }
        let body = Self::default_body(&request.method, request.url.path());
        Ok(ApiResponse::new(StatusCode::OK, body.to_string()))
    }
}

#[async_trait]
impl RefreshProtocol for FakeBackend {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let hang = self.lock().hang_refresh;
        if hang {
            std::future::pending::<()>().await;
        }
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }

        let mut state = self.lock();
        if !state.valid_refresh.contains(refresh_token) {
            return Err(Error::refresh_failed("401: Token is invalid or expired"));
        }

        state.issued += 1;
        let access = format!("access-{}", state.issued);
        state.valid_access.insert(access.clone());

        let refresh = if state.rotate_refresh {
            let rotated = format!("refresh-{}", state.issued);
            state.valid_refresh.clear();
            state.valid_refresh.insert(rotated.clone());
            Some(rotated)
        } else {
            None
        };

        Ok(RefreshedToken { access, refresh })
    }
}
