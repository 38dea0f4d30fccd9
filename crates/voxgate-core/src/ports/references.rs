//! Reference voice repository port.

use async_trait::async_trait;

use crate::domain::{ReferenceAudio, ReferenceId};
use crate::error::ReferenceError;

/// Durable id → (audio, transcript) mapping.
///
/// Implementations must make `add`, `delete` and `rename` atomic with
/// respect to one another and to `get`/`list`: a reader sees either the
/// state before a write or the state after it.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// Store a new reference. Fails with `AlreadyExists` if the id is taken.
    async fn add(&self, id: &ReferenceId, audio: &[u8], text: &str) -> Result<(), ReferenceError>;

    /// Snapshot of every stored id, sorted.
    async fn list(&self) -> Result<Vec<ReferenceId>, ReferenceError>;

    async fn delete(&self, id: &ReferenceId) -> Result<(), ReferenceError>;

    /// Move `old` to `new` as one step.
    async fn rename(&self, old: &ReferenceId, new: &ReferenceId) -> Result<(), ReferenceError>;

    async fn get(&self, id: &ReferenceId) -> Result<ReferenceAudio, ReferenceError>;
}
