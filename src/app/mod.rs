//! Core application logic and orchestration
//!
//! [`App`] wires the model store, the inference engine and the session store
//! together. Every interaction names the session it acts on; the session's
//! lock is held for the whole interaction, which serializes callbacks within
//! one session while leaving other sessions untouched.

mod chat;
mod events;
mod loader;

pub use chat::*;
pub use events::*;
pub use loader::*;

use anyhow::Result;
use std::{path::Path, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    config::{Config, GenerationSettings},
    llm::{InferenceEngine, LlmResult},
    provision::{ModelStore, ProvisionResult, StoreOutcome, StoredModel, Upload},
    session::{SessionStore, SharedSession},
};

/// Main application structure
pub struct App {
    config: Config,
    engine: Arc<dyn InferenceEngine>,
    store: ModelStore,
    sessions: SessionStore,
}

impl App {
    /// Create a new application instance
    pub async fn new(config: Config, engine: Arc<dyn InferenceEngine>) -> Result<Self> {
        debug!("Creating new App instance with engine {}", engine.name());

        let store = ModelStore::new(&config.models_dir);
        store.ensure_dir().await?;

        let sessions = SessionStore::new(config.system_prompt.clone());

        Ok(Self {
            config,
            engine,
            store,
            sessions,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Session for `id`, created on first use
    pub async fn session(&self, id: &str) -> SharedSession {
        self.sessions.get_or_create(id).await
    }

    /// Persist an uploaded model file and return where it lives
    pub async fn upload(&self, upload: &Upload) -> ProvisionResult<(StoredModel, StoreOutcome)> {
        let (stored, outcome) = self.store.store(upload).await?;
        match outcome {
            StoreOutcome::Saved => info!("Saved upload {}", stored.name),
            StoreOutcome::AlreadyPresent => info!("Reusing stored {}", stored.name),
        }
        Ok((stored, outcome))
    }

    /// Load (or reload) the model for a session
    pub async fn load_model(
        &self,
        session_id: &str,
        path: &Path,
        settings: &GenerationSettings,
    ) -> LlmResult<ModelInfo> {
        let session = self.session(session_id).await;
        let mut session = session.lock().await;
        let options = LoadOptions {
            verbose: self.config.verbose,
        };
        load_model(self.engine.as_ref(), &mut session, path, settings, options).await
    }

    /// Handle one user input for a session
    pub async fn submit(
        &self,
        session_id: &str,
        prompt: String,
        temperature: f32,
        events: &mpsc::UnboundedSender<ChatEvent>,
    ) -> LlmResult<TurnOutcome> {
        let session = self.session(session_id).await;
        let mut session = session.lock().await;
        submit(&mut session, prompt, temperature, events).await
    }
}
