//! System keyring credential storage (feature-gated).
//!
//! Uses the system's native credential store:
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//! - Windows: Credential Manager
//!
//! The pair is serialized to a single JSON entry, so both halves are
//! replaced in one keyring write.

use async_trait::async_trait;
use keyring::Entry;
use tracing::instrument;

use super::CredentialStore;
use crate::auth::token::CredentialPair;
use crate::auth::{Error, Result};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "jobtrack";

/// Keyring-based credential storage.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    /// Account name for the keyring entry.
    account: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringCredentialStore {
    /// Create a store with the default account name `session`.
    pub fn new() -> Self {
        Self {
            account: "session".to_string(),
        }
    }

    /// Create a store with a custom account name.
    pub fn with_account(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    /// Get the account name for this storage.
    pub fn account(&self) -> &str {
        &self.account
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account)
            .map_err(|e| Error::storage(format!("Failed to create keyring entry: {}", e)))
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Option<CredentialPair>> {
        let entry = self.entry()?;

        let result = tokio::task::spawn_blocking(move || entry.get_password())
            .await
            .map_err(|e| Error::storage(format!("Keyring task failed: {}", e)))?;

        match result {
            Ok(password) => {
                let pair: CredentialPair = serde_json::from_str(&password).map_err(|e| {
                    Error::storage(format!("Failed to parse credentials from keyring: {}", e))
                })?;
                Ok(CredentialPair::from_parts(Some(pair.access), Some(pair.refresh)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    }

    #[instrument(skip(self, pair))]
    async fn save(&self, pair: &CredentialPair) -> Result<()> {
        let entry = self.entry()?;
        let json = serde_json::to_string(pair)?;

        tokio::task::spawn_blocking(move || entry.set_password(&json))
            .await
            .map_err(|e| Error::storage(format!("Keyring task failed: {}", e)))??;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let entry = self.entry()?;

        let result = tokio::task::spawn_blocking(move || entry.delete_password())
            .await
            .map_err(|e| Error::storage(format!("Keyring task failed: {}", e)))?;

        match result {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn name(&self) -> &str {
        "keyring"
    }
}
