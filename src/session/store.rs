use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::SessionState;

/// Shared handle to one session; the lock serializes its interactions
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Registry of independent chat sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
    system_prompt: String,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            system_prompt: system_prompt.into(),
        }
    }

    /// Start a new session with a generated id
    pub async fn create(&self) -> (String, SharedSession) {
        let id = Uuid::new_v4().to_string();
        let session = self.get_or_create(&id).await;
        (id, session)
    }

    /// Get an existing session
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Get a session, initializing it on first use
    pub async fn get_or_create(&self, id: &str) -> SharedSession {
        if let Some(session) = self.get(id).await {
            return session;
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("Session created: {}", id);
                Arc::new(Mutex::new(SessionState::new(id, self.system_prompt.clone())))
            })
            .clone()
    }

    /// Discard a session together with its model handle and history
    pub async fn end(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        if removed.is_some() {
            debug!("Session ended: {}", id);
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
