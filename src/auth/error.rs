//! Error types for the job tracker client.
//!
//! One error enum covers the whole request path: credential storage,
//! session mutation, the request pipeline and the typed API consumers.
//! Authentication-class failures are resolved inside the pipeline where
//! possible; everything else propagates to the caller untouched.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the job tracker backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable credentials, or the single refresh attempt was exhausted.
    ///
    /// Terminal for the current session: the caller should send the user
    /// back to sign-in.
    #[error("Not authenticated - please sign in again")]
    Unauthorized,

    /// The refresh credential was rejected or the refresh call failed.
    ///
    /// The pipeline never surfaces this to consumers; it is reported as
    /// [`Error::Unauthorized`] after the session has been cleared.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// A credential pair was missing one of its halves.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Transport-level HTTP failure.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// A bounded call did not complete in time.
    #[error("Request timeout")]
    Timeout,

    /// The backend rejected the request (4xx other than 401).
    #[error("Validation error ({status}): {body}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the server, for form-level display.
        body: serde_json::Value,
    },

    /// The backend failed (5xx).
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Raw response text.
        message: String,
    },

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential storage errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or unjoinable URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a refresh failure.
    pub fn refresh_failed(msg: impl Into<String>) -> Self {
        Error::RefreshFailed(msg.into())
    }

    /// Check if this is an authentication-class error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Unauthorized | Error::RefreshFailed(_))
    }

    /// Check if this is a transient transport failure.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout)
    }

    /// Returns true if the caller may retry the same call later.
    ///
    /// The pipeline itself never retries these beyond the single
    /// authentication retry.
    pub fn is_retriable(&self) -> bool {
        self.is_network() || matches!(self, Error::Server { .. })
    }

    /// Get the HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized => Some(401),
            Error::Validation { status, .. } | Error::Server { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(feature = "keyring")]
impl From<keyring::Error> for Error {
    fn from(err: keyring::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
