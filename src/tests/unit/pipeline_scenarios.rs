//! Request Pipeline Scenarios
//!
//! Credential attachment, the single refresh-and-retry, failure handling and
//! concurrent 401s, end to end through `JobTracker` over a fake backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use crate::api::ListQuery;
use crate::auth::{ApiRequest, Error, GuardState, Navigation, Route};
use crate::tests::common::fixtures::*;
use crate::tests::mocks::FakeBackend;

fn list_request() -> ApiRequest {
    ApiRequest::get(url::Url::parse("http://jobtrack.test/api/applications/").unwrap())
}

// =============================================================================
// Outbound Stage
// =============================================================================

#[tokio::test]
async fn test_every_request_carries_current_credential() {
    let backend = Arc::new(FakeBackend::new().accepting(ACCESS, REFRESH));
    let (tracker, _store) = signed_in(&backend).await;

    tracker.dashboard().stats().await.unwrap();
    tracker.applications().list(&ListQuery::default()).await.unwrap();

    assert_eq!(
        backend.bearers(),
        vec![Some(ACCESS.to_string()), Some(ACCESS.to_string())]
    );
    assert_eq!(backend.refresh_calls(), 0);
}

#[tokio::test]
async fn test_login_switches_outbound_credential() {
    let backend = Arc::new(FakeBackend::new().accepting("A", "R"));
    let tracker = tracker(&backend, Default::default());
    tracker.hydrate().await;

    tracker.login("A", "R").await.unwrap();
    tracker.dashboard().stats().await.unwrap();

    assert_eq!(backend.bearers(), vec![Some("A".to_string())]);
}

// =============================================================================
// Inbound Stage: Refresh and Retry
// =============================================================================

#[tokio::test]
async fn test_single_401_refreshes_once_and_retries_once() {
    let backend = Arc::new(FakeBackend::new().expired_access(REFRESH));
    let (tracker, store) = signed_in(&backend).await;

    let stats = tracker.dashboard().stats().await.unwrap();
    assert_eq!(stats.total(), 0);

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(
        backend.bearers(),
        vec![Some(ACCESS.to_string()), Some("access-1".to_string())]
    );

    // Refresh credential unchanged, new access persisted.
    let persisted = store.snapshot().await.unwrap();
    assert_eq!(persisted.access, "access-1");
    assert_eq!(persisted.refresh, REFRESH);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_caller_never_sees_original_401() {
    let backend = Arc::new(FakeBackend::new().expired_access(REFRESH));
    let (tracker, _store) = signed_in(&backend).await;

    let response = tracker
        .pipeline()
        .send(list_request())
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotated_refresh_credential_is_kept() {
    let backend = Arc::new(FakeBackend::new().expired_access(REFRESH).rotating());
    let (tracker, store) = signed_in(&backend).await;

    tracker.dashboard().stats().await.unwrap();

    let persisted = store.snapshot().await.unwrap();
    assert_eq!(persisted.access, "access-1");
    assert_eq!(persisted.refresh, "refresh-1");
    assert_eq!(tracker.session().refresh_token().as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_refresh_failure_is_unauthorized_and_clears_store() {
    let backend = Arc::new(FakeBackend::new());
    let (tracker, store) = signed_in(&backend).await;
    let guard = tracker.guard();

    let err = tracker.dashboard().stats().await.unwrap_err();

    assert!(matches!(err, Error::Unauthorized));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.snapshot().await, None);
    assert!(!tracker.session().is_authenticated());
    assert_eq!(guard.state(), GuardState::Unauthenticated);
    assert_eq!(
        guard.check(Route::Applications),
        Navigation::Redirect {
            to: Route::SignIn,
            replace: true
        }
    );
}

#[tokio::test]
async fn test_repeated_401_refreshes_at_most_once() {
    let backend = Arc::new(FakeBackend::new().accepting(ACCESS, REFRESH).always_unauthorized());
    let (tracker, _store) = signed_in(&backend).await;

    let err = tracker.dashboard().stats().await.unwrap_err();

    assert!(matches!(err, Error::Unauthorized));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test]
async fn test_each_logical_request_gets_its_own_single_refresh() {
    let backend = Arc::new(FakeBackend::new().accepting(ACCESS, REFRESH).always_unauthorized());
    let (tracker, _store) = signed_in(&backend).await;

    for _ in 0..3 {
        assert!(tracker.dashboard().stats().await.is_err());
    }
    assert_eq!(backend.refresh_calls(), 3);
    assert_eq!(backend.calls().len(), 6);
}

#[tokio::test]
async fn test_unauthenticated_call_fails_without_refresh() {
    let backend = Arc::new(FakeBackend::new());
    let tracker = tracker(&backend, Default::default());
    tracker.hydrate().await;

    let err = tracker
        .applications()
        .list(&ListQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized));
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(backend.bearers(), vec![None]);
}

#[tokio::test]
async fn test_guard_blocks_list_before_any_call() {
    let backend = Arc::new(FakeBackend::new());
    let tracker = tracker(&backend, Default::default());
    tracker.hydrate().await;

    let outcome = tracker.guard().check(Route::Applications);
    assert!(matches!(outcome, Navigation::Redirect { to: Route::SignIn, .. }));
    assert!(backend.calls().is_empty());
}

// =============================================================================
// Non-Authentication Failures
// =============================================================================

#[tokio::test]
async fn test_other_statuses_pass_through_without_refresh() {
    let backend = Arc::new(FakeBackend::new().accepting(ACCESS, REFRESH));
    let (tracker, _store) = signed_in(&backend).await;

    backend.push_response(
        StatusCode::BAD_REQUEST,
        json!({"position": ["This field is required."]}),
    );
    backend.push_response(StatusCode::SERVICE_UNAVAILABLE, json!("maintenance"));

    match tracker.dashboard().stats().await {
        Err(Error::Validation { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body["position"][0], "This field is required.");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(matches!(
        tracker.dashboard().stats().await,
        Err(Error::Server { status: 503, .. })
    ));
    assert_eq!(backend.refresh_calls(), 0);
    assert!(tracker.session().is_authenticated());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let backend = Arc::new(
        FakeBackend::new()
            .expired_access(REFRESH)
            .with_refresh_delay(Duration::from_millis(50)),
    );
    let (tracker, store) = signed_in(&backend).await;

    let query = ListQuery::default();
    let (stats, page) = tokio::join!(
        tracker.dashboard().stats(),
        tracker.applications().list(&query)
    );

    assert!(stats.is_ok());
    assert!(page.is_ok());
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.write_count(), 1);

    let retried: Vec<_> = backend
        .bearers()
        .into_iter()
        .filter(|b| b.as_deref() == Some("access-1"))
        .collect();
    assert_eq!(retried.len(), 2);
}

#[tokio::test]
async fn test_late_401_for_replaced_credential_skips_refresh() {
    let backend = Arc::new(
        FakeBackend::new()
            .expired_access(REFRESH)
            .with_request_delay(Duration::from_millis(20)),
    );
    let (tracker, _store) = signed_in(&backend).await;

    // First call refreshes; the second was sent with the old credential and
    // comes back 401 after the refresh has already landed.
    let first = tracker.dashboard().stats();
    let second = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        tracker.dashboard().stats().await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_refresh_times_out_and_clears_session() {
    let backend = Arc::new(FakeBackend::new().expired_access(REFRESH).hanging_refresh());
    let store = persisted_store();
    let tracker = tracker_with_timeout(&backend, store.clone(), Duration::from_secs(2));
    tracker.hydrate().await;

    let err = tracker.dashboard().stats().await.unwrap_err();

    assert!(matches!(err, Error::Unauthorized));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.snapshot().await, None);
}

// =============================================================================
// Sign-In During Refresh
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_sign_in_during_refresh_keeps_new_pair() {
    let backend = Arc::new(
        FakeBackend::new()
            .expired_access(REFRESH)
            .accepting("B", "R2")
            .with_refresh_delay(Duration::from_millis(50)),
    );
    let (tracker, store) = signed_in(&backend).await;

    let call = tracker.dashboard().stats();
    let sign_in = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        tracker.login("B", "R2").await
    };
    let (call, sign_in) = tokio::join!(call, sign_in);

    sign_in.unwrap();
    assert!(call.is_ok());
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(tracker.session().access_token().as_deref(), Some("B"));
    assert_eq!(tracker.session().refresh_token().as_deref(), Some("R2"));
    assert_eq!(store.snapshot().await, Some(pair("B", "R2")));
    assert_eq!(
        backend.bearers(),
        vec![Some(ACCESS.to_string()), Some("B".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_of_replaced_pair_keeps_new_sign_in() {
    // refresh-0 is not accepted: the refresh started for it fails.
    let backend = Arc::new(
        FakeBackend::new()
            .accepting("B", "R2")
            .with_refresh_delay(Duration::from_millis(50)),
    );
    let (tracker, store) = signed_in(&backend).await;
    let guard = tracker.guard();

    let call = tracker.dashboard().stats();
    let sign_in = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        tracker.login("B", "R2").await
    };
    let (call, sign_in) = tokio::join!(call, sign_in);

    sign_in.unwrap();
    assert!(call.is_ok());
    assert!(tracker.session().is_authenticated());
    assert_eq!(guard.state(), GuardState::Authenticated);
    assert_eq!(store.snapshot().await, Some(pair("B", "R2")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_401s_on_worker_threads_refresh_once() {
    let backend = Arc::new(
        FakeBackend::new()
            .expired_access(REFRESH)
            .with_refresh_delay(Duration::from_millis(5)),
    );
    let (tracker, store) = signed_in(&backend).await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.dashboard().stats().await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.write_count(), 1);
}
