use std::sync::Arc;

use anyhow::Context;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::database::{self, DataStore};
use crate::storage::{StorageClient, UploadSigner};

/// Shared handles every function handler receives through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DataStore>,
    pub signer: Arc<dyn UploadSigner>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Connect the configured store and build the storage client and JWT keys.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store = database::connect(&config.database)
            .await
            .context("failed to initialize data store")?;
        tracing::info!("Using {} data store", store.name());

        let signer = StorageClient::from_config(&config.storage).context("invalid storage configuration")?;
        if !config.storage.is_configured() {
            tracing::warn!("STORAGE_URL is not set; upload URLs will be unavailable");
        }

        let jwt = JwtKeys::from_config(&config.security).context("invalid JWT configuration")?;

        Ok(Self::new(config, store, Arc::new(signer), jwt))
    }

    pub fn new(config: AppConfig, store: Arc<dyn DataStore>, signer: Arc<dyn UploadSigner>, jwt: JwtKeys) -> Self {
        Self {
            config: Arc::new(config),
            store,
            signer,
            jwt: Arc::new(jwt),
        }
    }
}
