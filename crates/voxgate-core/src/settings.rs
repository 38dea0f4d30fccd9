//! Service settings shared by the driver, the task registry and the gateway.

use std::time::Duration;

use thiserror::Error;

/// Default number of task workers.
pub const DEFAULT_WORKERS: usize = 1;
/// Default number of concurrent engine calls.
pub const DEFAULT_ENGINE_CONCURRENCY: usize = 1;
/// Default retention for finished tasks.
pub const DEFAULT_TASK_RETENTION: Duration = Duration::from_secs(3600);
/// Default cap on retained finished tasks.
pub const DEFAULT_MAX_TASKS: usize = 1000;
/// Default period of the eviction sweep.
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Tunables for generation and task bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Maximum text length in characters; `0` disables the check.
    pub max_text_length: usize,
    /// Size of the task worker pool.
    pub workers: usize,
    /// Permits in the capacity gate shared by synchronous and asynchronous work.
    pub engine_concurrency: usize,
    /// How long a finished task stays queryable.
    pub task_retention: Duration,
    /// Upper bound on finished tasks kept at once.
    pub max_tasks: usize,
    /// How often the eviction sweep runs.
    pub eviction_interval: Duration,
}

impl ServiceSettings {
    pub const fn with_defaults() -> Self {
        Self {
            max_text_length: 0,
            workers: DEFAULT_WORKERS,
            engine_concurrency: DEFAULT_ENGINE_CONCURRENCY,
            task_retention: DEFAULT_TASK_RETENTION,
            max_tasks: DEFAULT_MAX_TASKS,
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Settings validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Worker count must be between 1 and 64, got {0}")]
    InvalidWorkers(usize),

    #[error("Engine concurrency must be between 1 and 64, got {0}")]
    InvalidEngineConcurrency(usize),

    #[error("Max retained tasks must be at least 1, got {0}")]
    InvalidMaxTasks(usize),

    #[error("Task retention must be greater than zero")]
    ZeroRetention,

    #[error("Eviction interval must be greater than zero")]
    ZeroEvictionInterval,
}

/// Validate settings before any component is built from them.
pub fn validate_settings(settings: &ServiceSettings) -> Result<(), SettingsError> {
    if !(1..=64).contains(&settings.workers) {
        return Err(SettingsError::InvalidWorkers(settings.workers));
    }

    if !(1..=64).contains(&settings.engine_concurrency) {
        return Err(SettingsError::InvalidEngineConcurrency(
            settings.engine_concurrency,
        ));
    }

    if settings.max_tasks == 0 {
        return Err(SettingsError::InvalidMaxTasks(settings.max_tasks));
    }

    if settings.task_retention.is_zero() {
        return Err(SettingsError::ZeroRetention);
    }

    if settings.eviction_interval.is_zero() {
        return Err(SettingsError::ZeroEvictionInterval);
    }

    Ok(())
}
