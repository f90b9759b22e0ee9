//! Common types shared by inference engines and the chat loop

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Parameters used to construct a model handle
#[derive(Debug, Clone, PartialEq)]
pub struct LoadParams {
    /// Path of the GGUF file on disk
    pub model_path: PathBuf,

    /// Context window size in tokens
    pub n_ctx: u32,

    /// Number of layers offloaded to a GPU (0 keeps everything on the CPU)
    pub n_gpu_layers: u32,

    /// Let the native library print its own diagnostics
    pub verbose: bool,
}

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
}

/// Why a completion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
}

/// Incremental part of a streamed completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One fragment of a streamed chat completion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChunk {
    pub delta: ChunkDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl CompletionChunk {
    /// Opening fragment announcing the assistant role
    pub fn role(role: MessageRole) -> Self {
        Self {
            delta: ChunkDelta {
                role: Some(role),
                content: None,
            },
            finish_reason: None,
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self {
            delta: ChunkDelta {
                role: None,
                content: Some(text.into()),
            },
            finish_reason: None,
        }
    }

    /// Closing fragment with an empty delta
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            delta: ChunkDelta::default(),
            finish_reason: Some(reason),
        }
    }

    /// Text carried by this fragment; absent and empty content are the same
    pub fn text(&self) -> Option<&str> {
        self.delta.content.as_deref().filter(|text| !text.is_empty())
    }
}
