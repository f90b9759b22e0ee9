//! Inference engine abstractions
//!
//! The chat loop only talks to a [`ModelHandle`] obtained from an
//! [`InferenceEngine`]; tokenization, context management and sampling all
//! live behind these two traits.

pub mod decode;
pub mod engine;
pub mod errors;
pub mod types;

#[cfg(feature = "llama")]
pub mod llama;

#[cfg(test)]
pub mod testing;

pub use engine::*;
pub use errors::*;
pub use types::*;
