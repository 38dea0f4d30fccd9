//! Shared application state type.

use crate::bootstrap::AxumContext;
use std::sync::Arc;

/// Application state shared across all handlers.
///
/// This is an Arc-wrapped `AxumContext` holding the driver, the task
/// registry and the reference store.
pub type AppState = Arc<AxumContext>;
