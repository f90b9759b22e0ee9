//! Engine and model-handle traits, plus engine selection

use async_trait::async_trait;
use futures::Stream;
use std::{path::Path, pin::Pin, sync::Arc};
use tracing::debug;

use crate::llm::{
    errors::{LlmError, LlmResult},
    types::{ChatRequest, CompletionChunk, LoadParams},
};

/// Lazily produced completion fragments, ending when generation stops
pub type ChunkStream = Pin<Box<dyn Stream<Item = LlmResult<CompletionChunk>> + Send>>;

/// Something that can turn a model file into a ready-to-use handle
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Construct a handle for the model at `params.model_path`
    async fn load(&self, params: LoadParams) -> LlmResult<Box<dyn ModelHandle>>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// A loaded model together with its execution settings
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// Start a streamed chat completion over the full message history
    async fn chat_completion_stream(&self, request: ChatRequest) -> LlmResult<ChunkStream>;

    /// Path of the file the handle was loaded from
    fn model_path(&self) -> &Path;

    /// Context window the handle was built with
    fn n_ctx(&self) -> u32;
}

/// Engine used when the binary was built without an inference backend
#[derive(Debug, Default, Clone)]
pub struct UnavailableEngine;

#[async_trait]
impl InferenceEngine for UnavailableEngine {
    async fn load(&self, params: LoadParams) -> LlmResult<Box<dyn ModelHandle>> {
        debug!("Refusing to load {}: no engine compiled in", params.model_path.display());
        Err(LlmError::EngineUnavailable(
            "this build has no local inference backend; rebuild with `--features llama`"
                .to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Pick the engine compiled into this binary
pub fn default_engine(verbose: bool) -> LlmResult<Arc<dyn InferenceEngine>> {
    #[cfg(feature = "llama")]
    {
        let engine = crate::llm::llama::LlamaEngine::new(verbose)?;
        Ok(Arc::new(engine))
    }

    #[cfg(not(feature = "llama"))]
    {
        let _ = verbose;
        Ok(Arc::new(UnavailableEngine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_unavailable_engine_always_fails() {
        let engine = UnavailableEngine;
        let params = LoadParams {
            model_path: PathBuf::from("models/x.gguf"),
            n_ctx: 2048,
            n_gpu_layers: 0,
            verbose: false,
        };

        let err = engine.load(params).await.err().unwrap();
        assert!(matches!(err, LlmError::EngineUnavailable(_)));
        assert_eq!(engine.name(), "unavailable");
    }

    #[cfg(not(feature = "llama"))]
    #[test]
    fn test_default_engine_without_backend() {
        let engine = default_engine(false).unwrap();
        assert_eq!(engine.name(), "unavailable");
    }
}
