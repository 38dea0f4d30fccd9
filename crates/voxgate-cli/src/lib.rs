#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use anyhow as _;
use tokio as _;
use tracing as _;

pub mod parser;
pub mod startup;

pub use parser::Cli;
pub use startup::load_env_filter;
