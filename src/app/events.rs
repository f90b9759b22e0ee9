//! Events emitted by the chat loop for whoever renders the conversation

use serde::{Deserialize, Serialize};

/// Marker appended to the partial response while it is still streaming
pub const STREAMING_CURSOR: &str = "▌";

/// Warning shown when input arrives before a model is loaded
pub const NO_MODEL_WARNING: &str =
    "No model loaded. Upload a GGUF file in the sidebar and press Load / Reload.";

/// Display updates produced while handling one user input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The user's input was recorded
    UserMessage { content: String },

    /// Generation started
    AssistantStarted,

    /// Accumulated response so far, followed by the streaming cursor
    AssistantPartial { text: String },

    /// Generation ended; `content` is the final response
    AssistantFinished { content: String },

    /// Input was recorded but not answered
    Warning { message: String },
}
