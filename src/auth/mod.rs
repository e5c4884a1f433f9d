//! Authenticated request pipeline and session-state management.
//!
//! Data flow:
//!
//! 1. Sign-in produces a [`CredentialPair`].
//! 2. [`SessionState::login`] stores it and mirrors it to the [`CredentialStore`].
//! 3. The [`Pipeline`] attaches the access credential to every call.
//! 4. On a 401 the pipeline exchanges the refresh credential once through the
//!    [`RefreshProtocol`], updates the session and retries the call.
//! 5. The [`RouteGuard`] watches the session to permit or deny navigation.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jobtrack_client::auth::{
//!     FileCredentialStore, HttpRefresher, HttpTransport, Pipeline, SessionState,
//! };
//!
//! let store = FileCredentialStore::app_data_path()?;
//! let session = SessionState::new(Arc::new(store));
//! session.hydrate().await;
//!
//! let http = reqwest::Client::new();
//! let pipeline = Pipeline::builder(session.clone())
//!     .transport(Arc::new(HttpTransport::new(http.clone())))
//!     .refresher(Arc::new(HttpRefresher::new(http, refresh_url)))
//!     .build()?;
//! ```

pub mod error;
pub mod guard;
pub mod pipeline;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod token;
pub mod transport;

pub use error::{Error, Result};
pub use guard::{GuardState, History, Navigation, Route, RouteGuard};
pub use pipeline::{Attempt, Inbound, Pipeline, PipelineBuilder, DEFAULT_REFRESH_TIMEOUT};
pub use refresh::{HttpRefresher, RefreshProtocol, RefreshedToken};
pub use session::{Session, SessionSnapshot, SessionState};
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use token::{decode_subject, mask_token, CredentialPair};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

#[cfg(feature = "keyring")]
pub use storage::KeyringCredentialStore;
