use std::fmt;

use crate::llm::{Message, MessageRole, ModelHandle};

/// Whether a session currently holds a usable model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    NoModel,
    ModelLoaded,
}

/// State of a single chat session
pub struct SessionState {
    id: String,
    model: Option<Box<dyn ModelHandle>>,
    messages: Vec<Message>,
}

impl SessionState {
    /// Create a session whose history starts with the system prompt
    pub fn new(id: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: None,
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn state(&self) -> ModelState {
        if self.has_model() {
            ModelState::ModelLoaded
        } else {
            ModelState::NoModel
        }
    }

    pub fn model(&self) -> Option<&dyn ModelHandle> {
        self.model.as_deref()
    }

    /// Take ownership of a freshly loaded handle, dropping any previous one
    pub fn install_model(&mut self, handle: Box<dyn ModelHandle>) {
        self.model = Some(handle);
    }

    /// Drop the current handle, if any
    pub fn clear_model(&mut self) -> bool {
        self.model.take().is_some()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Full history, system prompt first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// History as shown to the user (system messages hidden)
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|message| message.role != MessageRole::System)
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("id", &self.id)
            .field("model", &self.model.as_ref().map(|m| m.model_path().to_path_buf()))
            .field("messages", &self.messages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{testing::ScriptedEngine, InferenceEngine, LoadParams};
    use std::path::PathBuf;

    async fn handle() -> Box<dyn ModelHandle> {
        ScriptedEngine::default()
            .load(LoadParams {
                model_path: PathBuf::from("models/x.gguf"),
                n_ctx: 512,
                n_gpu_layers: 0,
                verbose: false,
            })
            .await
            .map_err(|e| e.to_string())
            .unwrap()
    }

    #[test]
    fn test_new_session_starts_with_system_prompt() {
        let session = SessionState::new("s1", "Be brief.");

        assert_eq!(session.id(), "s1");
        assert_eq!(session.state(), ModelState::NoModel);
        assert_eq!(session.messages(), &[Message::system("Be brief.")]);
        assert_eq!(session.visible_messages().count(), 0);
    }

    #[test]
    fn test_visible_messages_hide_system_prompt() {
        let mut session = SessionState::new("s1", "Be brief.");
        session.push(Message::user("hi"));
        session.push(Message::assistant("hello"));

        let visible: Vec<_> = session.visible_messages().cloned().collect();
        assert_eq!(visible, vec![Message::user("hi"), Message::assistant("hello")]);
        assert_eq!(session.messages()[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_install_and_clear_model() {
        let mut session = SessionState::new("s1", "sys");
        assert!(!session.has_model());
        assert!(!session.clear_model());

        session.install_model(handle().await);
        assert!(session.has_model());
        assert_eq!(session.state(), ModelState::ModelLoaded);
        assert_eq!(session.model().unwrap().n_ctx(), 512);

        assert!(session.clear_model());
        assert!(!session.has_model());
        assert_eq!(session.state(), ModelState::NoModel);
        assert!(session.model().is_none());
    }
}
