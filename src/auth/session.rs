//! Session state: who is signed in.
//!
//! [`SessionState`] is the single owner of the in-memory session. The
//! credential store is a passive mirror: it is read once by
//! [`SessionState::hydrate`] and written on every mutation. Every change is
//! broadcast on a `watch` channel so the route guard and any UI layer see
//! the same state as the request pipeline.
//!
//! Mutations are serialized; a store write and the matching in-memory
//! update happen together, so readers never see a torn pair.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use super::error::{Error, Result};
use super::storage::CredentialStore;
use super::token::{mask_token, CredentialPair};

/// The client's current authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<CredentialPair>,
    subject: Option<String>,
}

impl Session {
    fn from_pair(credentials: Option<CredentialPair>) -> Self {
        let subject = credentials.as_ref().and_then(|pair| {
            let subject = pair.subject();
            if subject.is_none() {
                debug!("Access credential has no decodable subject");
            }
            subject
        });
        Self {
            credentials,
            subject,
        }
    }

    /// True iff an access credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.access.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.refresh.as_str())
    }

    /// Display-only subject decoded from the access credential.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn credentials(&self) -> Option<&CredentialPair> {
        self.credentials.as_ref()
    }
}

/// What subscribers observe: the session plus whether hydration has run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: Session,
    pub hydrated: bool,
}

struct Inner {
    store: Arc<dyn CredentialStore>,
    tx: watch::Sender<SessionSnapshot>,
    write_lock: Mutex<()>,
}

/// Shared handle to the session. Cheap to clone.
#[derive(Clone)]
pub struct SessionState {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("store", &self.inner.store.name())
            .field("snapshot", &*self.inner.tx.borrow())
            .finish()
    }
}

impl SessionState {
    /// Create an empty, not yet hydrated session over a store.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                store,
                tx,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Load the session from the credential store.
    ///
    /// A store that cannot be read counts as "no credentials".
    #[instrument(skip(self), fields(store = self.inner.store.name()))]
    pub async fn hydrate(&self) -> Session {
        let _guard = self.inner.write_lock.lock().await;

        let stored = match self.inner.store.load().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Credential store unavailable, starting signed out");
                None
            }
        };

        let session = Session::from_pair(stored);
        info!(
            authenticated = session.is_authenticated(),
            subject = session.subject().unwrap_or("-"),
            "Session hydrated"
        );
        self.publish(session.clone());
        session
    }

    /// Sign in with a credential pair. Both halves must be non-empty.
    #[instrument(skip(self, access, refresh))]
    pub async fn login(&self, access: impl Into<String>, refresh: impl Into<String>) -> Result<()> {
        let pair = CredentialPair::new(access, refresh)?;
        let _guard = self.inner.write_lock.lock().await;

        self.persist(&pair).await;
        let session = Session::from_pair(Some(pair));
        info!(subject = session.subject().unwrap_or("-"), "Signed in");
        self.publish(session);
        Ok(())
    }

    /// Sign out locally. The backend is not contacted.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let _guard = self.inner.write_lock.lock().await;
        self.clear_store().await;
        self.publish(Session::default());
        info!("Signed out");
    }

    /// Clear the session after an unrecoverable authentication failure.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, reason: &str) {
        let _guard = self.inner.write_lock.lock().await;
        self.clear_store().await;
        self.publish(Session::default());
        warn!(reason, "Session invalidated");
    }

    /// Clear the session only while `failed_refresh` is still its refresh
    /// credential. Returns whether anything was cleared.
    ///
    /// A failure for a pair that a newer sign-in already replaced leaves the
    /// newer session untouched.
    #[instrument(skip(self, failed_refresh))]
    pub async fn invalidate_if(&self, failed_refresh: &str, reason: &str) -> bool {
        let _guard = self.inner.write_lock.lock().await;

        if self.inner.tx.borrow().session.refresh_token() != Some(failed_refresh) {
            debug!("Failed refresh credential no longer current, keeping session");
            return false;
        }

        self.clear_store().await;
        self.publish(Session::default());
        warn!(reason, "Session invalidated");
        true
    }

    /// Swap in an access credential obtained with `refreshed_with`.
    ///
    /// The refresh credential is kept unless the server rotated it. Fails
    /// with [`Error::Unauthorized`] if the session was cleared meanwhile, so
    /// a late refresh cannot resurrect a signed-out session. If the session
    /// holds a different refresh credential by now, the refreshed access is
    /// discarded and the current pair is returned as is.
    #[instrument(skip(self, refreshed_with, access, rotated_refresh))]
    pub async fn replace_access(
        &self,
        refreshed_with: &str,
        access: impl Into<String>,
        rotated_refresh: Option<String>,
    ) -> Result<CredentialPair> {
        let _guard = self.inner.write_lock.lock().await;

        let current = self.inner.tx.borrow().session.credentials.clone();
        let Some(current) = current else {
            debug!("Session cleared before refreshed credential arrived");
            return Err(Error::Unauthorized);
        };

        if current.refresh != refreshed_with {
            debug!("Session replaced during refresh, discarding refreshed credential");
            return Ok(current);
        }

        let updated = current.with_access(access, rotated_refresh);
        self.persist(&updated).await;
        debug!(access = %mask_token(&updated.access), "Access credential replaced");
        self.publish(Session::from_pair(Some(updated.clone())));
        Ok(updated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tx.borrow().session.is_authenticated()
    }

    pub fn is_hydrated(&self) -> bool {
        self.inner.tx.borrow().hydrated
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.tx.borrow().session.access_token().map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.tx.borrow().session.refresh_token().map(str::to_string)
    }

    pub fn subject(&self) -> Option<String> {
        self.inner.tx.borrow().session.subject().map(str::to_string)
    }

    /// Current session and hydration flag.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.tx.borrow().clone()
    }

    /// Receive every future session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.tx.subscribe()
    }

    fn publish(&self, session: Session) {
        self.inner.tx.send_replace(SessionSnapshot {
            session,
            hydrated: true,
        });
    }

    async fn persist(&self, pair: &CredentialPair) {
        if let Err(e) = self.inner.store.save(pair).await {
            warn!(error = %e, store = self.inner.store.name(), "Failed to persist credentials");
        }
    }

    async fn clear_store(&self) {
        if let Err(e) = self.inner.store.clear().await {
            warn!(error = %e, store = self.inner.store.name(), "Failed to clear credentials");
        }
    }
}
