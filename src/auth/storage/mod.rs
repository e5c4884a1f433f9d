//! Durable credential storage.
//!
//! This module provides the [`CredentialStore`] trait and its backends:
//!
//! - [`FileCredentialStore`] - JSON file in the user data directory
//! - [`MemoryCredentialStore`] - In-memory storage for tests and ephemeral sessions
//! - [`KeyringCredentialStore`] - System keyring storage (requires `keyring` feature)
//!
//! The store is a passive mirror of the session: it is read once when the
//! session hydrates and written on every session mutation. It never talks to
//! the network and never validates tokens.
//!
//! # Atomicity
//!
//! Every backend replaces the whole [`CredentialPair`] in one write, so a
//! concurrent reader can never observe an access credential from one pair
//! next to a refresh credential from another.

mod file;
mod memory;

#[cfg(feature = "keyring")]
mod keyring;

use async_trait::async_trait;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

#[cfg(feature = "keyring")]
pub use keyring::KeyringCredentialStore;

use super::token::CredentialPair;
use super::Result;

/// Trait for credential storage backends.
///
/// All implementations must be thread-safe (`Send + Sync`) since the
/// session and every in-flight request share one store.
///
/// # Security Notes
///
/// - Never log credential values in implementations
/// - Use `#[instrument(skip(pair))]` when tracing save operations
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential pair.
    ///
    /// - `Ok(Some(pair))` if both halves are stored
    /// - `Ok(None)` if nothing (or only half a pair) is stored
    /// - `Err(_)` if the backing storage is unavailable
    async fn load(&self) -> Result<Option<CredentialPair>>;

    /// Replace the stored pair.
    async fn save(&self, pair: &CredentialPair) -> Result<()>;

    /// Remove both credentials. Succeeds if nothing was stored.
    async fn clear(&self) -> Result<()>;

    /// Get the name of this storage backend, for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<T> {
    async fn load(&self) -> Result<Option<CredentialPair>> {
        (**self).load().await
    }

    async fn save(&self, pair: &CredentialPair) -> Result<()> {
        (**self).save(pair).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for Box<T> {
    async fn load(&self) -> Result<Option<CredentialPair>> {
        (**self).load().await
    }

    async fn save(&self, pair: &CredentialPair) -> Result<()> {
        (**self).save(pair).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
