//! In-process llama.cpp engine
//!
//! Loading and token generation are blocking native calls, so both run on
//! tokio's blocking pool. Generated fragments are pushed through a channel
//! and surface as a [`ChunkStream`]; once the receiving side is dropped the
//! generation loop stops at the next token.

use async_trait::async_trait;
use llama_cpp_2::{
    context::params::LlamaContextParams,
    llama_backend::LlamaBackend,
    llama_batch::LlamaBatch,
    model::{params::LlamaModelParams, AddBos, LlamaChatMessage, LlamaModel, Special},
    sampling::LlamaSampler,
};
use std::{
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::{
    decode::TokenDecoder,
    engine::{ChunkStream, InferenceEngine, ModelHandle},
    errors::{LlmError, LlmResult},
    types::{ChatRequest, CompletionChunk, FinishReason, LoadParams, Message, MessageRole},
};

type ChunkSender = mpsc::UnboundedSender<LlmResult<CompletionChunk>>;

/// Engine backed by `llama-cpp-2`
pub struct LlamaEngine {
    backend: Arc<LlamaBackend>,
}

impl LlamaEngine {
    /// Initialize the llama.cpp backend. Must happen once per process.
    pub fn new(verbose: bool) -> LlmResult<Self> {
        let mut backend = LlamaBackend::init()
            .map_err(|e| LlmError::EngineUnavailable(format!("llama backend init failed: {}", e)))?;

        if !verbose {
            backend.void_logs();
        }

        Ok(Self {
            backend: Arc::new(backend),
        })
    }
}

#[async_trait]
impl InferenceEngine for LlamaEngine {
    async fn load(&self, params: LoadParams) -> LlmResult<Box<dyn ModelHandle>> {
        let backend = self.backend.clone();
        let path = params.model_path.clone();

        info!(
            "Loading {} (n_ctx={}, n_gpu_layers={})",
            path.display(),
            params.n_ctx,
            params.n_gpu_layers
        );

        let model = tokio::task::spawn_blocking(move || {
            let model_params = LlamaModelParams::default().with_n_gpu_layers(params.n_gpu_layers);
            LlamaModel::load_from_file(&backend, &params.model_path, &model_params)
                .map_err(|e| LlmError::load(&params.model_path, e))
        })
        .await
        .map_err(|e| LlmError::load(&path, e))??;

        Ok(Box::new(LlamaHandle {
            backend: self.backend.clone(),
            model: Arc::new(model),
            path,
            n_ctx: params.n_ctx,
        }))
    }

    fn name(&self) -> &str {
        "llama.cpp"
    }
}

/// A loaded GGUF model. A fresh context is created for every completion.
pub struct LlamaHandle {
    backend: Arc<LlamaBackend>,
    model: Arc<LlamaModel>,
    path: PathBuf,
    n_ctx: u32,
}

#[async_trait]
impl ModelHandle for LlamaHandle {
    async fn chat_completion_stream(&self, request: ChatRequest) -> LlmResult<ChunkStream> {
        let prompt = render_prompt(&self.model, &request.messages)?;
        debug!("Rendered prompt of {} bytes", prompt.len());

        let (tx, rx) = mpsc::unbounded_channel();
        let backend = self.backend.clone();
        let model = self.model.clone();
        let n_ctx = self.n_ctx;
        let temperature = request.temperature;

        tokio::task::spawn_blocking(move || {
            if let Err(e) = generate(&backend, &model, &prompt, n_ctx, temperature, &tx) {
                warn!("Generation aborted: {}", e);
                let _ = tx.send(Err(e));
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    fn model_path(&self) -> &Path {
        &self.path
    }

    fn n_ctx(&self) -> u32 {
        self.n_ctx
    }
}

/// Apply the chat template embedded in the model file
fn render_prompt(model: &LlamaModel, messages: &[Message]) -> LlmResult<String> {
    let template = model
        .chat_template(None)
        .map_err(|e| LlmError::Generation(format!("model has no usable chat template: {}", e)))?;

    let chat = messages
        .iter()
        .map(|message| LlamaChatMessage::new(message.role.as_str().to_string(), message.content.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LlmError::InvalidParams(e.to_string()))?;

    model
        .apply_chat_template(&template, &chat, true)
        .map_err(|e| LlmError::Generation(e.to_string()))
}

fn build_sampler(temperature: f32) -> LlamaSampler {
    if temperature <= 0.0 {
        return LlamaSampler::greedy();
    }

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    LlamaSampler::chain_simple([LlamaSampler::temp(temperature), LlamaSampler::dist(seed)])
}

/// Decode the prompt, then sample until end-of-generation or a full context
fn generate(
    backend: &LlamaBackend,
    model: &LlamaModel,
    prompt: &str,
    n_ctx: u32,
    temperature: f32,
    tx: &ChunkSender,
) -> LlmResult<()> {
    let ctx_params = LlamaContextParams::default().with_n_ctx(NonZeroU32::new(n_ctx));
    let mut ctx = model
        .new_context(backend, ctx_params)
        .map_err(|e| LlmError::Generation(format!("unable to create context: {}", e)))?;

    let tokens = model
        .str_to_token(prompt, AddBos::Always)
        .map_err(|e| LlmError::Generation(format!("tokenization failed: {}", e)))?;

    if tokens.len() >= n_ctx as usize {
        return Err(LlmError::Generation(format!(
            "conversation needs {} tokens but the context window holds {}",
            tokens.len(),
            n_ctx
        )));
    }

    let mut batch = LlamaBatch::new(n_ctx as usize, 1);
    let last_index = tokens.len() as i32 - 1;
    for (i, token) in (0_i32..).zip(tokens.into_iter()) {
        batch
            .add(token, i, &[0], i == last_index)
            .map_err(|e| LlmError::Generation(e.to_string()))?;
    }
    ctx.decode(&mut batch)
        .map_err(|e| LlmError::Generation(format!("llama_decode() failed: {}", e)))?;

    if tx.send(Ok(CompletionChunk::role(MessageRole::Assistant))).is_err() {
        return Ok(());
    }

    let mut sampler = build_sampler(temperature);
    let mut decoder = TokenDecoder::new();
    let mut n_cur = batch.n_tokens();

    loop {
        if n_cur as u32 >= n_ctx {
            let _ = tx.send(Ok(CompletionChunk::finish(FinishReason::Length)));
            return Ok(());
        }

        let token = sampler.sample(&ctx, batch.n_tokens() - 1);
        sampler.accept(token);

        if model.is_eog_token(token) {
            let _ = tx.send(Ok(CompletionChunk::finish(FinishReason::Stop)));
            return Ok(());
        }

        let bytes = model
            .token_to_bytes(token, Special::Tokenize)
            .map_err(|e| LlmError::Generation(e.to_string()))?;
        let piece = decoder.push(&bytes);

        if tx.send(Ok(CompletionChunk::content(piece))).is_err() {
            debug!("Stream receiver dropped, stopping generation");
            return Ok(());
        }

        batch.clear();
        batch
            .add(token, n_cur, &[0], true)
            .map_err(|e| LlmError::Generation(e.to_string()))?;
        n_cur += 1;

        ctx.decode(&mut batch)
            .map_err(|e| LlmError::Generation(format!("failed to eval: {}", e)))?;
    }
}
