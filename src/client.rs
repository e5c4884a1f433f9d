//! The `JobTracker` facade: one place that wires the store, the session,
//! the pipeline and the API consumers together from configuration.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, ApplicationsApi, DashboardApi, RefreshSignal, SocialLoginApi};
use crate::auth::{
    CredentialStore, FileCredentialStore, HttpRefresher, HttpTransport,
    MemoryCredentialStore, Pipeline, RefreshProtocol, Result, RouteGuard, Session, SessionState,
    Transport,
};
use crate::config::{ApiConfig, AppConfig, StorageBackend};

/// A fully wired client.
#[derive(Debug, Clone)]
pub struct JobTracker {
    session: SessionState,
    pipeline: Pipeline,
    applications: ApplicationsApi,
    dashboard: DashboardApi,
    social_login: SocialLoginApi,
    signal: RefreshSignal,
}

impl JobTracker {
    /// Build everything described by `config`. Does not hydrate.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = open_store(config)?;
        let http = reqwest::Client::builder()
            .timeout(config.api.request_timeout())
            .build()?;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(http.clone()));
        let refresher: Arc<dyn RefreshProtocol> =
            Arc::new(HttpRefresher::new(http, config.api.refresh_url()?));

        Self::from_parts(&config.api, store, transport, refresher)
    }

    /// Build from explicit stages, e.g. scripted fakes in tests.
    pub fn from_parts(
        api: &ApiConfig,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        refresher: Arc<dyn RefreshProtocol>,
    ) -> Result<Self> {
        debug!(backend = store.name(), "Opening session");
        let session = SessionState::new(store);
        let pipeline = Pipeline::builder(session.clone())
            .transport(Arc::clone(&transport))
            .refresher(refresher)
            .refresh_timeout(api.refresh_timeout())
            .build()?;

        let client = ApiClient::new(pipeline.clone(), api.base_url()?);
        let signal = RefreshSignal::new();

        Ok(Self {
            applications: ApplicationsApi::new(client.clone(), signal.clone()),
            dashboard: DashboardApi::new(client),
            social_login: SocialLoginApi::new(
                transport,
                session.clone(),
                api.social_login_url()?,
            ),
            session,
            pipeline,
            signal,
        })
    }

    /// Read the persisted session. Call once at startup.
    pub async fn hydrate(&self) -> Session {
        self.session.hydrate().await
    }

    /// Sign in with a credential pair obtained elsewhere.
    pub async fn login(&self, access: impl Into<String>, refresh: impl Into<String>) -> Result<()> {
        self.session.login(access, refresh).await
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// A new guard watching this client's session.
    pub fn guard(&self) -> RouteGuard {
        RouteGuard::new(&self.session)
    }

    pub fn applications(&self) -> &ApplicationsApi {
        &self.applications
    }

    pub fn dashboard(&self) -> &DashboardApi {
        &self.dashboard
    }

    pub fn social_login(&self) -> &SocialLoginApi {
        &self.social_login
    }

    pub fn signal(&self) -> &RefreshSignal {
        &self.signal
    }
}

/// Open the configured credential backend.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn CredentialStore>> {
    match config.storage.backend {
        StorageBackend::File => {
            let store = match &config.storage.path {
                Some(path) => FileCredentialStore::new(path)?,
                None => FileCredentialStore::new(config.data_dir().join("credentials.json"))?,
            };
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryCredentialStore::new())),
        #[cfg(feature = "keyring")]
        StorageBackend::Keyring => Ok(Arc::new(crate::auth::KeyringCredentialStore::new())),
        #[cfg(not(feature = "keyring"))]
        StorageBackend::Keyring => Err(crate::auth::Error::config(
            "keyring storage requested but this build lacks the `keyring` feature",
        )),
    }
}
