//! File-based credential storage with secure permissions.
//!
//! Stores the credential pair as two keyed entries in one JSON file:
//!
//! ```json
//! {
//!   "access_token": "...",
//!   "refresh_token": "..."
//! }
//! ```
//!
//! - File permissions set to 0600 on Unix (owner read/write only)
//! - Parent directories created on first write
//! - Automatic `~` expansion to home directory
//! - Atomic writes via a temp file in the same directory + rename

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::CredentialStore;
use crate::auth::token::CredentialPair;
use crate::auth::{Error, Result};

/// App-specific data directory name.
const APP_DATA_DIR: &str = "jobtrack";

/// Credential file name.
const CREDENTIALS_FILE: &str = "credentials.json";

/// File permissions for the credential file (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// On-disk layout. Either half may be missing in a hand-edited or
/// partially written file; such a file does not count as signed in.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// File-based credential storage.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    /// Expanded path to the credential file.
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store at the specified path. Supports `~` expansion.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = expand_tilde(path.as_ref())?;
        Ok(Self { path })
    }

    /// Create a store at `<data dir>/jobtrack/credentials.json`.
    pub fn app_data_path() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| Error::config("Cannot determine user data directory"))?;
        Ok(Self {
            path: dir.join(APP_DATA_DIR).join(CREDENTIALS_FILE),
        })
    }

    /// Get the path to the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<Option<CredentialFile>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::storage(format!(
                    "Failed to read credential file '{}': {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let file: CredentialFile = serde_json::from_str(&content).map_err(|e| {
            Error::storage(format!(
                "Failed to parse credential file '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(Some(file))
    }

    #[instrument(skip(self, content))]
    async fn write_file(&self, content: String) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, content.as_bytes()))
            .await
            .map_err(|e| Error::storage(format!("Credential write task failed: {e}")))?
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| {
        Error::storage(format!(
            "Failed to create directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    // Temp file lives next to the target so the rename stays on one filesystem.
    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .map_err(|e| Error::storage(format!("Failed to create temp file: {e}")))?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(FILE_MODE))
            .map_err(|e| Error::storage(format!("Failed to set file permissions: {e}")))?;
    }

    temp.persist(path).map_err(|e| {
        Error::storage(format!(
            "Failed to move credentials into '{}': {}",
            path.display(),
            e.error
        ))
    })?;
    Ok(())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Option<CredentialPair>> {
        let Some(file) = self.read_file().await? else {
            return Ok(None);
        };
        let pair = CredentialPair::from_parts(file.access_token, file.refresh_token);
        if pair.is_none() {
            debug!(path = %self.path.display(), "Credential file holds an incomplete pair");
        }
        Ok(pair)
    }

    #[instrument(skip(self, pair))]
    async fn save(&self, pair: &CredentialPair) -> Result<()> {
        let file = CredentialFile {
            access_token: Some(pair.access.clone()),
            refresh_token: Some(pair.refresh.clone()),
        };
        let content = serde_json::to_string_pretty(&file)?;
        self.write_file(content).await
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(format!(
                "Failed to remove credential file '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Expand `~` prefix to user's home directory.
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if let Some(rest) = path_str.strip_prefix('~') {
        let home =
            dirs::home_dir().ok_or_else(|| Error::config("Cannot determine home directory"))?;
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if rest.is_empty() {
            Ok(home)
        } else {
            Ok(home.join(rest))
        }
    } else {
        Ok(path.to_path_buf())
    }
}
