#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use async_trait as _;

pub mod cache;
mod driver;
pub mod encode;
mod gate;
mod stream;
mod tone;

pub use cache::{Fingerprint, PromptCache};
pub use driver::{EncodedAudio, GenerationDriver};
pub use gate::CapacityGate;
pub use stream::AudioStream;
pub use tone::ToneEngine;
