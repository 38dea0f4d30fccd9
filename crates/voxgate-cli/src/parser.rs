//! Command-line flags and their mapping onto the server configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use voxgate_axum::ServerConfig;
use voxgate_axum::bootstrap::DEFAULT_PORT;
use voxgate_core::ServiceSettings;
use voxgate_core::settings::{
    DEFAULT_ENGINE_CONCURRENCY, DEFAULT_EVICTION_INTERVAL, DEFAULT_MAX_TASKS,
    DEFAULT_TASK_RETENTION, DEFAULT_WORKERS,
};

/// HTTP gateway for text-to-speech generation.
///
/// Every flag can also be set through its `VOXGATE_*` environment variable.
#[derive(Debug, Parser)]
#[command(name = "voxgate")]
#[command(about = "Text-to-speech gateway with reference voices and async tasks")]
#[command(version)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "VOXGATE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "VOXGATE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bearer token required on every route except health
    #[arg(long, env = "VOXGATE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory holding saved reference voices
    #[arg(long, env = "VOXGATE_REFERENCES_DIR", default_value = "references")]
    pub references_dir: PathBuf,

    /// Directory for asynchronous task results [default: <tmp>/voxgate_async_results]
    #[arg(long, env = "VOXGATE_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Maximum text length in characters; 0 disables the check
    #[arg(long, env = "VOXGATE_MAX_TEXT_LENGTH", default_value_t = 0)]
    pub max_text_length: usize,

    /// Number of asynchronous task workers
    #[arg(long, env = "VOXGATE_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Engine calls allowed to run at once
    #[arg(long, env = "VOXGATE_ENGINE_CONCURRENCY", default_value_t = DEFAULT_ENGINE_CONCURRENCY)]
    pub engine_concurrency: usize,

    /// Seconds a finished task stays queryable
    #[arg(long, env = "VOXGATE_TASK_RETENTION_SECS", default_value_t = DEFAULT_TASK_RETENTION.as_secs())]
    pub task_retention_secs: u64,

    /// Finished tasks kept at most
    #[arg(long, env = "VOXGATE_MAX_TASKS", default_value_t = DEFAULT_MAX_TASKS)]
    pub max_tasks: usize,

    /// Seconds between eviction sweeps
    #[arg(long, env = "VOXGATE_EVICTION_INTERVAL_SECS", default_value_t = DEFAULT_EVICTION_INTERVAL.as_secs())]
    pub eviction_interval_secs: u64,

    /// Allowed CORS origin; repeat for several. All origins are allowed when unset
    #[arg(long = "cors-origin", env = "VOXGATE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

impl Cli {
    /// Build the server configuration these flags describe.
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::with_defaults();
        let mut config = ServerConfig {
            host: self.host,
            port: self.port,
            api_key: None,
            references_dir: self.references_dir,
            results_dir: self.results_dir.unwrap_or(defaults.results_dir),
            settings: ServiceSettings {
                max_text_length: self.max_text_length,
                workers: self.workers,
                engine_concurrency: self.engine_concurrency,
                task_retention: Duration::from_secs(self.task_retention_secs),
                max_tasks: self.max_tasks,
                eviction_interval: Duration::from_secs(self.eviction_interval_secs),
            },
            cors: defaults.cors,
        };

        if let Some(key) = self.api_key {
            config = config.with_api_key(key);
        }
        if !self.cors_origins.is_empty() {
            config = config.with_allowed_origins(self.cors_origins);
        }
        config
    }
}
