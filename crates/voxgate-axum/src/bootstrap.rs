//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the gateway. All concrete implementations are instantiated here.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;

use voxgate_core::{
    ReferenceRepository, ServiceSettings, SettingsError, SynthesisEngine, validate_settings,
};
use voxgate_driver::{GenerationDriver, ToneEngine};
use voxgate_store::FsReferenceStore;
use voxgate_tasks::TaskRegistry;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the gateway.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port for the HTTP server.
    pub port: u16,
    /// Shared bearer secret; `None` disables authentication.
    pub api_key: Option<String>,
    /// Root of the reference store.
    pub references_dir: PathBuf,
    /// Where asynchronous task results are written.
    pub results_dir: PathBuf,
    /// Generation and task tunables.
    pub settings: ServiceSettings,
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Create config with default paths.
    pub fn with_defaults() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: DEFAULT_PORT,
            api_key: None,
            references_dir: PathBuf::from("references"),
            results_dir: std::env::temp_dir().join("voxgate_async_results"),
            settings: ServiceSettings::with_defaults(),
            cors: CorsConfig::default(),
        }
    }

    /// Require this bearer token on every route except health.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration errors found before bootstrap.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("API key must not be empty")]
    EmptyApiKey,

    #[error("Invalid CORS origin '{0}'")]
    InvalidOrigin(String),
}

/// Validate a server configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_settings(&config.settings)?;
    config.socket_addr()?;

    if config.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
        return Err(ConfigError::EmptyApiKey);
    }

    if let CorsConfig::AllowOrigins(origins) = &config.cors {
        if let Some(bad) = origins
            .iter()
            .find(|o| o.parse::<axum::http::HeaderValue>().is_err())
        {
            return Err(ConfigError::InvalidOrigin(bad.clone()));
        }
    }

    Ok(())
}

/// Application context for the gateway.
pub struct AxumContext {
    /// Saved reference voices.
    pub references: Arc<dyn ReferenceRepository>,
    /// Generation front shared by the sync path and the task workers.
    pub driver: Arc<GenerationDriver>,
    /// Asynchronous tasks.
    pub registry: Arc<TaskRegistry>,
    /// Expected bearer token, if authentication is enabled.
    pub api_key: Option<Arc<str>>,
}

impl AxumContext {
    /// Wire the driver and the registry around an engine and a store, and
    /// start the registry's workers.
    pub fn assemble(
        engine: Arc<dyn SynthesisEngine>,
        references: Arc<dyn ReferenceRepository>,
        results_dir: impl Into<PathBuf>,
        settings: &ServiceSettings,
    ) -> Self {
        let driver = Arc::new(GenerationDriver::new(
            engine,
            Arc::clone(&references),
            settings,
        ));
        let registry = TaskRegistry::new(Arc::clone(&driver), results_dir, settings);
        registry.start();

        Self {
            references,
            driver,
            registry,
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: Option<&str>) -> Self {
        self.api_key = key.map(Arc::from);
        self
    }
}

/// Bootstrap the gateway with the built-in tone engine.
pub async fn bootstrap(config: ServerConfig) -> Result<AxumContext> {
    bootstrap_with_engine(config, Arc::new(ToneEngine::default())).await
}

/// Bootstrap the gateway around a specific synthesis engine.
pub async fn bootstrap_with_engine(
    config: ServerConfig,
    engine: Arc<dyn SynthesisEngine>,
) -> Result<AxumContext> {
    validate_config(&config)?;

    tracing::info!(
        target: "voxgate.paths",
        references_dir = %config.references_dir.display(),
        results_dir = %config.results_dir.display(),
        sample_rate = engine.sample_rate(),
        "Gateway bootstrap resolved paths"
    );

    // 1. Reference store
    let store = FsReferenceStore::open(&config.references_dir)
        .await
        .with_context(|| {
            format!(
                "failed to open reference store at {}",
                config.references_dir.display()
            )
        })?;

    // 2. Results directory
    tokio::fs::create_dir_all(&config.results_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create results directory {}",
                config.results_dir.display()
            )
        })?;

    // 3. Driver and task registry
    let ctx = AxumContext::assemble(
        engine,
        Arc::new(store),
        config.results_dir.clone(),
        &config.settings,
    )
    .with_api_key(config.api_key.as_deref());

    Ok(ctx)
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;

    let addr = config.socket_addr()?;
    let auth_enabled = config.api_key.is_some();
    let cors = config.cors.clone();
    let ctx = bootstrap(config).await?;
    let registry = Arc::clone(&ctx.registry);

    let app = crate::routes::create_router(ctx, &cors);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        target: "voxgate.http",
        addr = %listener.local_addr()?,
        auth_enabled,
        "voxgate listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.shutdown_cleanup();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!(target: "voxgate.http", "Shutdown requested");
}
