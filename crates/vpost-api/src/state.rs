//! Application state.

use vpost_runner::JobPipeline;
use vpost_store::JobStore;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: JobStore,
    pub pipeline: JobPipeline,
}

impl AppState {
    /// Create new application state: open the store, apply the schema,
    /// and make sure the staging and generated directories exist.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = JobStore::connect(&config.database_url).await?;
        store.migrate().await?;

        tokio::fs::create_dir_all(&config.staging_dir).await?;
        tokio::fs::create_dir_all(&config.generated_dir).await?;

        let pipeline = JobPipeline::new(store.clone(), config.worker_config());

        Ok(Self {
            config,
            store,
            pipeline,
        })
    }

    /// Close the store handle. Used on shutdown.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
