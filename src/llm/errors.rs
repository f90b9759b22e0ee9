//! Error types for the inference boundary

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Inference engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LlmError {
    pub fn load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Load {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type LlmResult<T> = Result<T, LlmError>;
