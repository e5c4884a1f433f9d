//! In-memory credential storage for testing and ephemeral use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use super::CredentialStore;
use crate::auth::token::CredentialPair;
use crate::auth::Result;

/// In-memory credential storage.
///
/// Clones share the same slot, so a test can keep a handle to the store it
/// gave the session and inspect what was persisted. Writes are counted.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    slot: Arc<RwLock<Option<CredentialPair>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a pair, as if a previous process
    /// had signed in.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(pair))),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `save` calls that reached this store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current contents without going through the trait.
    pub async fn snapshot(&self) -> Option<CredentialPair> {
        self.slot.read().await.clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<CredentialPair>> {
        Ok(self.slot.read().await.clone())
    }

    #[instrument(skip(self, pair))]
    async fn save(&self, pair: &CredentialPair) -> Result<()> {
        *self.slot.write().await = Some(pair.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
