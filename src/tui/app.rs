use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    app::{App as Core, ChatEvent},
    provision::{StoreOutcome, Upload},
    tui::{
        components::{
            chat::ChatView,
            input::{InputAction, TextInput},
            sidebar::{Sidebar, SidebarAction, SidebarFocus, StatusKind},
            Component,
        },
        events::Event,
        keys::KeyMap,
        styles::Theme,
        utils::centered_rect,
        Frame,
    },
    utils::text::format::format_elapsed,
};

/// Width of the model settings column
const SIDEBAR_WIDTH: u16 = 38;

/// Lines moved per PgUp/PgDn
const SCROLL_STEP: u16 = 5;

/// Which control receives key input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar(SidebarFocus),
    Prompt,
}

/// Background operation currently running for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    Uploading,
    Loading,
    Generating,
}

impl Busy {
    fn describe(&self) -> &'static str {
        match self {
            Busy::Uploading => "saving file",
            Busy::Loading => "loading model",
            Busy::Generating => "generating",
        }
    }
}

/// Terminal front end for one chat session
pub struct App {
    /// Whether the application should quit
    pub should_quit: bool,

    core: Arc<Core>,
    session_id: String,

    key_map: KeyMap,
    theme: Theme,

    focus: Focus,
    sidebar: Sidebar,
    chat: ChatView,
    prompt: TextInput,

    show_help: bool,
    busy: Option<Busy>,
    model_loaded: bool,

    /// Event sender for results of background tasks
    event_sender: mpsc::UnboundedSender<Event>,
}

impl App {
    /// Open a fresh session on `core`
    pub async fn new(core: Arc<Core>, event_sender: mpsc::UnboundedSender<Event>) -> Result<Self> {
        let (session_id, session) = core.sessions().create().await;
        let mut chat = ChatView::new();
        chat.load_history(session.lock().await.visible_messages());

        let mut sidebar = Sidebar::new(core.config().generation_settings());
        sidebar.set_focus_on(Some(SidebarFocus::Upload));

        Ok(Self {
            should_quit: false,
            core,
            session_id,
            key_map: KeyMap::default(),
            theme: Theme::default(),
            focus: Focus::Sidebar(SidebarFocus::Upload),
            sidebar,
            chat,
            prompt: TextInput::new("Message").with_placeholder("Type a message and press Enter"),
            show_help: false,
            busy: None,
            model_loaded: false,
            event_sender,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Handle incoming events; returns true when the application should exit
    pub async fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Key(key_event) => self.handle_key(key_event),

            Event::Paste(text) => match self.focus {
                Focus::Prompt => self.prompt.insert_str(&text),
                Focus::Sidebar(_) => self.sidebar.paste(&text),
            },

            Event::Resize(width, height) => {
                debug!("Terminal resized to {}x{}", width, height);
            }

            Event::Tick => self.sidebar.tick(),

            Event::Chat(chat_event) => self.chat.apply(chat_event),

            Event::Uploaded(result) => {
                self.busy = None;
                match result {
                    Ok((model, outcome)) => {
                        let text = match outcome {
                            StoreOutcome::Saved => format!("Saved: {}", model.name),
                            StoreOutcome::AlreadyPresent => {
                                format!("Already uploaded: {}", model.name)
                            }
                        };
                        self.sidebar.set_status(StatusKind::Success, text);
                        self.sidebar.select_model(model);
                    }
                    Err(e) => self
                        .sidebar
                        .set_status(StatusKind::Error, format!("Error occurred: {}", e)),
                }
            }

            Event::ModelLoaded(result) => {
                self.busy = None;
                match result {
                    Ok(info) => {
                        self.model_loaded = true;
                        self.sidebar.set_status(
                            StatusKind::Success,
                            format!(
                                "Model loaded! ({})",
                                format_elapsed(info.elapsed)
                            ),
                        );
                    }
                    Err(e) => {
                        self.model_loaded = false;
                        self.sidebar
                            .set_status(StatusKind::Error, format!("Error occurred: {}", e));
                    }
                }
            }

            Event::TurnFinished(error) => {
                self.busy = None;
                if let Some(e) = error {
                    self.chat.abort_streaming();
                    self.sidebar
                        .set_status(StatusKind::Error, format!("Error occurred: {}", e));
                }
            }
        }

        Ok(self.should_quit)
    }

    fn handle_key(&mut self, key_event: KeyEvent) {
        if self.key_map.should_quit(&key_event) {
            self.should_quit = true;
            return;
        }

        if self.key_map.should_show_help(&key_event) {
            self.show_help = !self.show_help;
            return;
        }

        if self.show_help {
            if key_event.code == KeyCode::Esc {
                self.show_help = false;
            }
            return;
        }

        if self.key_map.should_load(&key_event) {
            self.start_load();
            return;
        }

        if self.key_map.is_next_focus(&key_event) {
            self.move_focus(1);
            return;
        }

        if self.key_map.is_prev_focus(&key_event) {
            self.move_focus(-1);
            return;
        }

        match key_event.code {
            KeyCode::PageUp => return self.chat.scroll_up(SCROLL_STEP),
            KeyCode::PageDown => return self.chat.scroll_down(SCROLL_STEP),
            _ => {}
        }

        match self.focus {
            Focus::Prompt => {
                if let InputAction::Submit(text) = self.prompt.handle_key(key_event) {
                    self.start_submit(text);
                }
            }
            Focus::Sidebar(_) => match self.sidebar.handle_key(key_event) {
                SidebarAction::Upload(path) => self.start_upload(path),
                SidebarAction::Load => self.start_load(),
                SidebarAction::None => {}
            },
        }
    }

    /// Controls in tab order; the load button only exists once a file is chosen
    fn focus_order(&self) -> Vec<Focus> {
        let mut order = vec![
            Focus::Sidebar(SidebarFocus::Upload),
            Focus::Sidebar(SidebarFocus::ContextSize),
            Focus::Sidebar(SidebarFocus::Temperature),
        ];
        if self.sidebar.selected_model().is_some() {
            order.push(Focus::Sidebar(SidebarFocus::LoadButton));
        }
        order.push(Focus::Prompt);
        order
    }

    fn move_focus(&mut self, delta: isize) {
        let order = self.focus_order();
        let current = order.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(order.len() as isize) as usize;
        self.set_focus(order[next]);
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        match focus {
            Focus::Prompt => {
                self.sidebar.set_focus_on(None);
                self.prompt.set_focus(true);
            }
            Focus::Sidebar(inner) => {
                self.prompt.set_focus(false);
                self.sidebar.set_focus_on(Some(inner));
            }
        }
    }

    fn refuse_when_busy(&mut self) -> bool {
        match self.busy {
            Some(busy) => {
                warn!("Ignoring request while {}", busy.describe());
                self.sidebar.set_status(
                    StatusKind::Info,
                    format!("Please wait, still {}...", busy.describe()),
                );
                true
            }
            None => false,
        }
    }

    fn start_upload(&mut self, path: PathBuf) {
        if self.refuse_when_busy() {
            return;
        }
        self.busy = Some(Busy::Uploading);
        self.sidebar.set_status(StatusKind::Busy, "Saving file...");

        let core = Arc::clone(&self.core);
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let result = match Upload::from_path(&path).await {
                Ok(upload) => core.upload(&upload).await,
                Err(e) => Err(e),
            };
            let _ = sender.send(Event::Uploaded(result.map_err(|e| e.to_string())));
        });
    }

    fn start_load(&mut self) {
        let Some(model) = self.sidebar.selected_model().cloned() else {
            self.sidebar
                .set_status(StatusKind::Error, "Upload a GGUF file before loading");
            return;
        };
        if self.refuse_when_busy() {
            return;
        }
        self.busy = Some(Busy::Loading);
        // The previous model is released as soon as loading starts
        self.model_loaded = false;
        self.sidebar
            .set_status(StatusKind::Busy, "Loading model... (CPU may take a while)");

        let settings = self.sidebar.settings();
        let core = Arc::clone(&self.core);
        let session_id = self.session_id.clone();
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let result = core
                .load_model(&session_id, &model.path, &settings)
                .await
                .map_err(|e| e.to_string());
            let _ = sender.send(Event::ModelLoaded(result));
        });
    }

    fn start_submit(&mut self, prompt: String) {
        if self.refuse_when_busy() {
            // Give the text back so it is not lost
            self.prompt.set_content(prompt);
            return;
        }
        self.busy = Some(Busy::Generating);

        let temperature = self.sidebar.settings().temperature;
        let core = Arc::clone(&self.core);
        let session_id = self.session_id.clone();
        let sender = self.event_sender.clone();
        tokio::spawn(async move {
            let (chat_tx, mut chat_rx) = mpsc::unbounded_channel::<ChatEvent>();

            let forward_sender = sender.clone();
            let forward = tokio::spawn(async move {
                while let Some(event) = chat_rx.recv().await {
                    if forward_sender.send(Event::Chat(event)).is_err() {
                        break;
                    }
                }
            });

            let result = core.submit(&session_id, prompt, temperature, &chat_tx).await;
            drop(chat_tx);
            // All chat events reach the UI before the turn is reported finished
            let _ = forward.await;

            let _ = sender.send(Event::TurnFinished(result.err().map(|e| e.to_string())));
        });
    }

    /// Render the application UI
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Main content
                Constraint::Length(1), // Status bar
            ])
            .split(frame.size());

        frame.render_widget(Block::default().style(self.theme.base_style()), frame.size());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .split(chunks[0]);

        self.sidebar.render(frame, columns[0], &self.theme);
        self.render_main(frame, columns[1]);
        self.render_status_bar(frame, chunks[1]);

        if self.show_help {
            self.render_help_overlay(frame);
        }
    }

    fn render_main(&mut self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title
                Constraint::Min(3),    // Conversation
                Constraint::Length(3), // Prompt
            ])
            .split(area);

        let title = Paragraph::new(Line::from(vec![
            Span::styled(" GGUF Chat ", self.theme.title_style()),
            Span::styled("local models via llama.cpp", self.theme.dim_style()),
        ]));
        frame.render_widget(title, rows[0]);

        self.chat.render(frame, rows[1], &self.theme);
        self.prompt.render(frame, rows[2], &self.theme);
    }

    /// Render the status bar
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let model = if self.model_loaded { "loaded" } else { "none" };
        let activity = self
            .busy
            .map(|busy| format!(" | {}", busy.describe()))
            .unwrap_or_default();
        let status_text = format!(
            "Session {} | Model: {}{} | Tab: next control | Ctrl+G help | Ctrl+C quit",
            short_id(&self.session_id),
            model,
            activity
        );

        let status_paragraph = Paragraph::new(status_text).style(self.theme.status_bar_style());
        frame.render_widget(status_paragraph, area);
    }

    /// Render help overlay
    fn render_help_overlay(&self, frame: &mut Frame) {
        let help_area = centered_rect(60, 50, frame.size());

        let help_block = Block::default()
            .borders(Borders::ALL)
            .title("Help (Esc to close)")
            .style(self.theme.help_style());

        let help_paragraph = Paragraph::new(self.key_map.help_text())
            .block(help_block)
            .style(self.theme.text_style());

        frame.render_widget(Clear, help_area);
        frame.render_widget(help_paragraph, help_area);
    }
}

fn short_id(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::NO_MODEL_WARNING,
        config::Config,
        llm::{testing::ScriptedEngine, CompletionChunk},
    };
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::TempDir;

    struct Harness {
        app: App,
        receiver: mpsc::UnboundedReceiver<Event>,
        _temp_dir: TempDir,
    }

    impl Harness {
        async fn new(engine: ScriptedEngine) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let config = Config {
                models_dir: temp_dir.path().join("models"),
                data_dir: temp_dir.path().join("data"),
                ..Default::default()
            };
            let core = Arc::new(Core::new(config, Arc::new(engine)).await.unwrap());
            let (sender, receiver) = mpsc::unbounded_channel();
            let app = App::new(core, sender).await.unwrap();
            Self {
                app,
                receiver,
                _temp_dir: temp_dir,
            }
        }

        async fn key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            self.app
                .handle_event(Event::Key(KeyEvent::new(code, modifiers)))
                .await
                .unwrap()
        }

        async fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.key(KeyCode::Char(c), KeyModifiers::NONE).await;
            }
        }

        /// Feed background events to the app until `done` matches one
        async fn pump_until(&mut self, done: impl Fn(&Event) -> bool) {
            loop {
                let event = self.receiver.recv().await.unwrap();
                let finished = done(&event);
                self.app.handle_event(event).await.unwrap();
                if finished {
                    return;
                }
            }
        }

        fn screen(&mut self) -> String {
            let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
            terminal.draw(|frame| self.app.render(frame)).unwrap();
            let buffer = terminal.backend().buffer();
            let mut out = String::new();
            for y in 0..30 {
                for x in 0..100 {
                    out.push_str(buffer.get(x, y).symbol());
                }
                out.push('\n');
            }
            out
        }
    }

    #[tokio::test]
    async fn test_quit_key() {
        let mut h = Harness::new(ScriptedEngine::default()).await;
        assert!(!h.key(KeyCode::Char('c'), KeyModifiers::NONE).await);
        assert!(h.key(KeyCode::Char('c'), KeyModifiers::CONTROL).await);
    }

    #[tokio::test]
    async fn test_focus_cycle_skips_load_button_without_model() {
        let mut h = Harness::new(ScriptedEngine::default()).await;
        assert_eq!(h.app.focus, Focus::Sidebar(SidebarFocus::Upload));

        h.key(KeyCode::Tab, KeyModifiers::NONE).await;
        h.key(KeyCode::Tab, KeyModifiers::NONE).await;
        assert_eq!(h.app.focus, Focus::Sidebar(SidebarFocus::Temperature));

        h.key(KeyCode::Tab, KeyModifiers::NONE).await;
        assert_eq!(h.app.focus, Focus::Prompt);

        h.key(KeyCode::BackTab, KeyModifiers::SHIFT).await;
        assert_eq!(h.app.focus, Focus::Sidebar(SidebarFocus::Temperature));
    }

    #[tokio::test]
    async fn test_message_without_model_shows_warning() {
        let mut h = Harness::new(ScriptedEngine::default()).await;
        h.app.set_focus(Focus::Prompt);
        h.type_text("hello there").await;
        h.key(KeyCode::Enter, KeyModifiers::NONE).await;

        h.pump_until(|e| matches!(e, Event::TurnFinished(_))).await;

        assert_eq!(h.app.chat.warning(), Some(NO_MODEL_WARNING));
        let screen = h.screen();
        assert!(screen.contains("hello there"));
        assert!(screen.contains("Model: none"));
    }

    #[tokio::test]
    async fn test_upload_load_and_chat_flow() {
        let engine = ScriptedEngine::new(vec![
            CompletionChunk::content("Hi"),
            CompletionChunk::content("!"),
        ]);
        let mut h = Harness::new(engine.clone()).await;

        let source_dir = TempDir::new().unwrap();
        let source = source_dir.path().join("tiny.gguf");
        std::fs::write(&source, b"GGUF").unwrap();

        h.app
            .handle_event(Event::Paste(source.display().to_string()))
            .await
            .unwrap();
        h.key(KeyCode::Enter, KeyModifiers::NONE).await;
        h.pump_until(|e| matches!(e, Event::Uploaded(_))).await;
        assert_eq!(
            h.app.sidebar.status().map(|s| s.text.as_str()),
            Some("Saved: tiny.gguf")
        );
        assert!(h.screen().contains("Using model: tiny.gguf"));

        h.key(KeyCode::Char('l'), KeyModifiers::CONTROL).await;
        h.pump_until(|e| matches!(e, Event::ModelLoaded(_))).await;
        assert!(h.app.model_loaded);
        assert_eq!(engine.loads()[0].n_ctx, 2048);

        h.app.set_focus(Focus::Prompt);
        h.type_text("hey").await;
        h.key(KeyCode::Enter, KeyModifiers::NONE).await;
        h.pump_until(|e| matches!(e, Event::TurnFinished(_))).await;

        assert_eq!(h.app.chat.messages().len(), 2);
        let screen = h.screen();
        assert!(screen.contains("Hi!"));
        assert!(screen.contains("Model: loaded"));
    }

    #[tokio::test]
    async fn test_rejected_upload_reports_error() {
        let mut h = Harness::new(ScriptedEngine::default()).await;
        h.type_text("notes.txt").await;
        h.key(KeyCode::Enter, KeyModifiers::NONE).await;
        h.pump_until(|e| matches!(e, Event::Uploaded(_))).await;

        let status = h.app.sidebar.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.text.contains("Only .gguf files"));
        assert!(h.app.sidebar.selected_model().is_none());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_no_model() {
        let mut h = Harness::new(ScriptedEngine::default()).await;
        h.app
            .handle_event(Event::ModelLoaded(Err("invalid magic number".to_string())))
            .await
            .unwrap();
        assert!(!h.app.model_loaded);

        let status = h.app.sidebar.status().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.text, "Error occurred: invalid magic number");
        assert!(h.screen().contains("Model: none"));
    }

    #[tokio::test]
    async fn test_help_overlay_toggle() {
        let mut h = Harness::new(ScriptedEngine::default()).await;
        h.key(KeyCode::Char('g'), KeyModifiers::CONTROL).await;
        assert!(h.screen().contains("Help (Esc to close)"));

        h.key(KeyCode::Esc, KeyModifiers::NONE).await;
        assert!(!h.screen().contains("Help (Esc to close)"));
    }
}
