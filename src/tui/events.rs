use crossterm::event::{self as terminal_event, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{
    app::{ChatEvent, ModelInfo},
    provision::{StoreOutcome, StoredModel},
};

/// Application events
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),

    /// Bracketed paste
    Paste(String),

    /// Terminal resize event
    Resize(u16, u16),

    /// Periodic tick event
    Tick,

    /// Display update from the chat loop
    Chat(ChatEvent),

    /// An upload finished (or failed with the given message)
    Uploaded(Result<(StoredModel, StoreOutcome), String>),

    /// A model load finished (or failed with the given message)
    ModelLoaded(Result<ModelInfo, String>),

    /// A chat turn ended; carries the error text if it failed
    TurnFinished(Option<String>),
}

/// Event handler for managing input events
pub struct EventHandler {
    /// Event receiver channel
    receiver: mpsc::UnboundedReceiver<Event>,

    /// Event sender channel
    sender: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new event handler and start reading terminal input
    pub fn new(tick_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        let input_sender = sender.clone();
        tokio::task::spawn_blocking(move || {
            Self::read_terminal(input_sender, tick_interval);
        });

        Self { receiver, sender }
    }

    /// Forward terminal events, emitting a tick whenever the poll times out.
    /// Returns once the receiving side is gone.
    fn read_terminal(sender: mpsc::UnboundedSender<Event>, tick_interval: Duration) {
        loop {
            let event = match terminal_event::poll(tick_interval) {
                Ok(true) => match terminal_event::read() {
                    Ok(event) => Self::convert_crossterm_event(event),
                    Err(e) => {
                        error!("Failed to read terminal event: {}", e);
                        return;
                    }
                },
                Ok(false) => Some(Event::Tick),
                Err(e) => {
                    error!("Failed to poll terminal events: {}", e);
                    return;
                }
            };

            if let Some(event) = event {
                if sender.send(event).is_err() {
                    debug!("Event receiver closed, stopping terminal reader");
                    return;
                }
            }
        }
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Convert crossterm events to application events
    fn convert_crossterm_event(event: CrosstermEvent) -> Option<Event> {
        match event {
            CrosstermEvent::Key(key_event) if key_event.kind != KeyEventKind::Release => {
                Some(Event::Key(key_event))
            }
            CrosstermEvent::Paste(text) => Some(Event::Paste(text)),
            CrosstermEvent::Resize(width, height) => Some(Event::Resize(width, height)),
            _ => None,
        }
    }

    /// Get a clone of the sender
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.sender.clone()
    }
}
