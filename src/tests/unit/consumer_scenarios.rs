//! Consumer Scenarios
//!
//! Typed consumers over the shared pipeline: refresh signal bookkeeping and
//! transparent recovery for mutations.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde_json::json;

use crate::api::{ApplicationStatus, NewApplication};
use crate::auth::Error;
use crate::tests::common::fixtures::*;
use crate::tests::mocks::FakeBackend;

fn application_body(id: u64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "company_name": "Globex",
        "position": "Platform Engineer",
        "current_status": status,
        "audits": [
            {"id": 1, "previous_status": "applied", "new_status": "phone_screen",
             "changed_at": "2024-04-01T09:00:00Z"},
            {"id": 2, "previous_status": "phone_screen", "new_status": status,
             "changed_at": "2024-04-08T09:00:00Z"}
        ]
    })
}

#[tokio::test]
async fn test_mutation_after_expiry_is_recovered_and_signalled_once() {
    let backend = Arc::new(FakeBackend::new().expired_access(REFRESH));
    let (tracker, _store) = signed_in(&backend).await;
    let mut changes = tracker.signal().subscribe();

    backend.push_response(StatusCode::OK, application_body(5, "offer"));
    let updated = tracker
        .applications()
        .change_status(5, ApplicationStatus::Offer)
        .await
        .unwrap();

    assert_eq!(updated.current_status, ApplicationStatus::Offer);
    assert_eq!(updated.recent_audits(1)[0].new_status, "offer");
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(tracker.signal().current(), 1);
    assert!(changes.has_changed().unwrap());

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.method == Method::PATCH && c.path == "/api/applications/5/"));
}

#[tokio::test]
async fn test_reads_do_not_bump_signal() {
    let backend = Arc::new(FakeBackend::new().accepting(ACCESS, REFRESH));
    let (tracker, _store) = signed_in(&backend).await;

    tracker.dashboard().stats().await.unwrap();
    backend.push_response(StatusCode::OK, application_body(1, "applied"));
    tracker.applications().get(1).await.unwrap();

    assert_eq!(tracker.signal().current(), 0);
}

#[tokio::test]
async fn test_rejected_create_surfaces_body_and_keeps_session() {
    let backend = Arc::new(FakeBackend::new().accepting(ACCESS, REFRESH));
    let (tracker, _store) = signed_in(&backend).await;

    backend.push_response(
        StatusCode::BAD_REQUEST,
        json!({"company_name": ["This field may not be blank."]}),
    );
    let err = tracker
        .applications()
        .create(&NewApplication::new("", "Engineer"))
        .await
        .unwrap_err();

    match err {
        Error::Validation { status, body } => {
            assert_eq!(status, 400);
            assert!(body.get("company_name").is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(tracker.session().is_authenticated());
    assert_eq!(tracker.signal().current(), 0);
}

#[tokio::test]
async fn test_unauthorized_mutation_does_not_signal() {
    let backend = Arc::new(FakeBackend::new());
    let (tracker, _store) = signed_in(&backend).await;

    let err = tracker.applications().delete(3).await.unwrap_err();

    assert!(err.is_auth_error());
    assert_eq!(tracker.signal().current(), 0);
}
