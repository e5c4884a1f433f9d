//! Session Lifecycle Scenarios
//!
//! Login, logout and reload (a fresh client hydrating from the same store).

use std::sync::Arc;

use crate::auth::{GuardState, History, MemoryCredentialStore, Navigation, Route};
use crate::auth::token::fake_jwt;
use crate::tests::common::fixtures::*;
use crate::tests::mocks::FakeBackend;

// =============================================================================
// Reload
// =============================================================================

#[tokio::test]
async fn test_login_then_reload_is_authenticated() {
    let backend = Arc::new(FakeBackend::new().accepting("A", "R"));
    let store = MemoryCredentialStore::new();

    let first = tracker(&backend, store.clone());
    first.hydrate().await;
    first.login("A", "R").await.unwrap();
    drop(first);

    let reloaded = tracker(&backend, store);
    let session = reloaded.hydrate().await;

    assert!(session.is_authenticated());
    assert_eq!(reloaded.pipeline().attach_credential().as_deref(), Some("A"));
    reloaded.dashboard().stats().await.unwrap();
    assert_eq!(backend.bearers(), vec![Some("A".to_string())]);
}

#[tokio::test]
async fn test_logout_then_reload_is_signed_out() {
    let backend = Arc::new(FakeBackend::new());
    let (first, store) = signed_in(&backend).await;

    first.logout().await;
    first.logout().await;
    assert_eq!(store.snapshot().await, None);

    let reloaded = tracker(&backend, store);
    let session = reloaded.hydrate().await;
    assert!(!session.is_authenticated());
    assert_eq!(reloaded.guard().state(), GuardState::Unauthenticated);
}

#[tokio::test]
async fn test_logout_never_calls_backend() {
    let backend = Arc::new(FakeBackend::new().accepting(ACCESS, REFRESH));
    let (tracker, _store) = signed_in(&backend).await;

    tracker.logout().await;

    assert!(backend.calls().is_empty());
    assert_eq!(backend.refresh_calls(), 0);
}

#[tokio::test]
async fn test_refreshed_access_survives_reload() {
    let backend = Arc::new(FakeBackend::new().expired_access(REFRESH));
    let (first, store) = signed_in(&backend).await;
    first.dashboard().stats().await.unwrap();

    let reloaded = tracker(&backend, store);
    reloaded.hydrate().await;
    assert_eq!(
        reloaded.session().access_token().as_deref(),
        Some("access-1")
    );
}

// =============================================================================
// Subject Display
// =============================================================================

#[tokio::test]
async fn test_subject_decoded_from_access_credential() {
    let backend = Arc::new(FakeBackend::new());
    let access = fake_jwt(serde_json::json!({"user_id": 42, "exp": 4_102_444_800u64}));
    let store = MemoryCredentialStore::with_pair(pair(&access, "R"));

    let tracker = tracker(&backend, store);
    let session = tracker.hydrate().await;

    assert_eq!(session.subject(), Some("42"));
}

#[tokio::test]
async fn test_undecodable_subject_still_authenticated() {
    let backend = Arc::new(FakeBackend::new());
    let tracker = tracker(&backend, persisted_store());
    let session = tracker.hydrate().await;

    assert!(session.is_authenticated());
    assert_eq!(session.subject(), None);
}

// =============================================================================
// Navigation
// =============================================================================

#[tokio::test]
async fn test_session_loss_redirects_without_back_loop() {
    let backend = Arc::new(FakeBackend::new());
    let (tracker, _store) = signed_in(&backend).await;
    let guard = tracker.guard();

    let mut history = History::new(Route::Dashboard);
    assert_eq!(
        history.navigate(&guard, Route::Application(7)),
        Navigation::Render(Route::Application(7))
    );

    // Refresh fails: the session is cleared behind the view's back.
    assert!(tracker.applications().get(7).await.is_err());

    history.revalidate(&guard);
    assert_eq!(history.current(), Route::SignIn);
    assert_eq!(history.back(), Route::Dashboard);
    assert!(matches!(
        history.revalidate(&guard),
        Navigation::Redirect { to: Route::SignIn, .. }
    ));
}

#[tokio::test]
async fn test_guard_pending_until_hydrated() {
    let backend = Arc::new(FakeBackend::new());
    let tracker = tracker(&backend, persisted_store());
    let mut guard = tracker.guard();

    assert_eq!(guard.check(Route::Dashboard), Navigation::Pending);
    tracker.hydrate().await;
    assert_eq!(guard.wait_ready().await, GuardState::Authenticated);
}
