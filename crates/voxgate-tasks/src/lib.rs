#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use voxgate_store as _;

mod manager;
mod table;

pub use manager::{RegistryConfig, TaskRegistry, TaskResult};
pub use table::{CancelOutcome, Claim, Evicted, JobOutcome, LeaseId, TaskTable};
