//! Port definitions: the seams between the core and its adapters.

mod engine;
mod references;

pub use engine::{PromptReference, SynthesisEngine, SynthesisRequest, SynthesisSession};
pub use references::ReferenceRepository;
