#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings for the integration suites
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tower as _;

pub mod auth;
pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod negotiate;
pub mod routes;
pub mod state;

// Re-export primary types
pub use bootstrap::{
    AxumContext, ConfigError, CorsConfig, ServerConfig, bootstrap, bootstrap_with_engine,
    start_server, validate_config,
};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
