//! In-memory engine that replays scripted fragments

use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::llm::{
    ChatRequest, ChunkStream, CompletionChunk, InferenceEngine, LlmError, LlmResult, LoadParams,
    ModelHandle,
};

#[derive(Default)]
struct Recorded {
    loads: Vec<LoadParams>,
    requests: Vec<ChatRequest>,
}

/// Engine whose handles stream a fixed list of fragments
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    /// Scripted fragments; `Err` entries become generation errors
    chunks: Vec<Result<CompletionChunk, String>>,
    fail_paths: Vec<PathBuf>,
    recorded: Arc<Mutex<Recorded>>,
}

impl ScriptedEngine {
    pub fn new(chunks: Vec<CompletionChunk>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Ok).collect(),
            ..Default::default()
        }
    }

    /// Fail the stream with a generation error after the given chunks
    pub fn with_stream_error(mut self, message: &str) -> Self {
        self.chunks.push(Err(message.to_string()));
        self
    }

    /// Reject loads of this path
    pub fn failing_on(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_paths.push(path.into());
        self
    }

    pub fn loads(&self) -> Vec<LoadParams> {
        self.recorded.lock().unwrap().loads.clone()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.recorded.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    async fn load(&self, params: LoadParams) -> LlmResult<Box<dyn ModelHandle>> {
        self.recorded.lock().unwrap().loads.push(params.clone());
        if self.fail_paths.contains(&params.model_path) {
            return Err(LlmError::load(&params.model_path, "invalid magic number"));
        }

        Ok(Box::new(ScriptedHandle {
            path: params.model_path,
            n_ctx: params.n_ctx,
            engine: self.clone(),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedHandle {
    path: PathBuf,
    n_ctx: u32,
    engine: ScriptedEngine,
}

#[async_trait]
impl ModelHandle for ScriptedHandle {
    async fn chat_completion_stream(&self, request: ChatRequest) -> LlmResult<ChunkStream> {
        self.engine.recorded.lock().unwrap().requests.push(request);
        let chunks: Vec<LlmResult<CompletionChunk>> = self
            .engine
            .chunks
            .iter()
            .map(|chunk| match chunk {
                Ok(chunk) => Ok(chunk.clone()),
                Err(message) => Err(LlmError::Generation(message.clone())),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    fn model_path(&self) -> &Path {
        &self.path
    }

    fn n_ctx(&self) -> u32 {
        self.n_ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn params() -> LoadParams {
        LoadParams {
            model_path: PathBuf::from("models/x.gguf"),
            n_ctx: 512,
            n_gpu_layers: 0,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_cloned_engine_replays_stream_error() {
        let engine = ScriptedEngine::new(vec![CompletionChunk::content("a")])
            .with_stream_error("decode failed");
        let copy = engine.clone();

        for engine in [engine, copy] {
            let handle = engine.load(params()).await.map_err(|e| e.to_string()).unwrap();
            let request = ChatRequest {
                messages: Vec::new(),
                temperature: 0.0,
            };
            let items: Vec<_> = handle
                .chat_completion_stream(request)
                .await
                .map_err(|e| e.to_string())
                .unwrap()
                .collect()
                .await;

            assert_eq!(items.len(), 2);
            assert_eq!(items[0].as_ref().map_err(|e| e.to_string()).unwrap().text(), Some("a"));
            match &items[1] {
                Err(LlmError::Generation(message)) => assert_eq!(message, "decode failed"),
                other => panic!("expected generation error, got {:?}", other.is_ok()),
            }
        }
    }
}
