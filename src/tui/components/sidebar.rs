//! Model settings sidebar: upload field, sliders, load button and status

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};
use std::path::PathBuf;

use super::{
    input::{InputAction, TextInput},
    Component,
};
use crate::{
    config::{GenerationSettings, Slider, CONTEXT_SIZE, TEMPERATURE},
    provision::StoredModel,
    tui::{styles::Theme, Frame},
};

/// Animation frames for the busy indicator
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Focusable controls inside the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarFocus {
    Upload,
    ContextSize,
    Temperature,
    LoadButton,
}

/// What the sidebar asks the application to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarAction {
    None,
    Upload(PathBuf),
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
    Busy,
}

/// Inline status line under the controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarStatus {
    pub kind: StatusKind,
    pub text: String,
}

/// Sidebar component holding the model settings
pub struct Sidebar {
    upload: TextInput,
    context_size: Slider,
    temperature: Slider,
    selected: Option<StoredModel>,
    status: Option<SidebarStatus>,
    focus: Option<SidebarFocus>,
    spinner_frame: usize,
}

impl Sidebar {
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            upload: TextInput::new("Upload GGUF file")
                .with_placeholder("path/to/model.gguf")
                .keep_on_submit(),
            context_size: Slider::new(CONTEXT_SIZE).with_value(settings.n_ctx as f64),
            temperature: Slider::new(TEMPERATURE).with_value(settings.temperature as f64),
            selected: None,
            status: None,
            focus: None,
            spinner_frame: 0,
        }
    }

    /// Current slider values
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings::from_sliders(&self.context_size, &self.temperature)
    }

    pub fn selected_model(&self) -> Option<&StoredModel> {
        self.selected.as_ref()
    }

    pub fn select_model(&mut self, model: StoredModel) {
        self.selected = Some(model);
    }

    pub fn status(&self) -> Option<&SidebarStatus> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(SidebarStatus {
            kind,
            text: text.into(),
        });
    }

    pub fn set_focus_on(&mut self, focus: Option<SidebarFocus>) {
        self.focus = focus;
        self.upload.set_focus(focus == Some(SidebarFocus::Upload));
    }

    /// Paste into the upload field
    pub fn paste(&mut self, text: &str) {
        if self.focus == Some(SidebarFocus::Upload) {
            self.upload.insert_str(text);
        }
    }

    pub fn tick(&mut self) {
        if matches!(self.status, Some(SidebarStatus { kind: StatusKind::Busy, .. })) {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> SidebarAction {
        match self.focus {
            Some(SidebarFocus::Upload) => match self.upload.handle_key(event) {
                InputAction::Submit(path) => SidebarAction::Upload(expand_home(&path)),
                InputAction::None => SidebarAction::None,
            },
            Some(SidebarFocus::ContextSize) => {
                adjust_slider(&mut self.context_size, event);
                SidebarAction::None
            }
            Some(SidebarFocus::Temperature) => {
                adjust_slider(&mut self.temperature, event);
                SidebarAction::None
            }
            Some(SidebarFocus::LoadButton) => match event.code {
                KeyCode::Enter | KeyCode::Char(' ') if self.selected.is_some() => {
                    SidebarAction::Load
                }
                _ => SidebarAction::None,
            },
            None => SidebarAction::None,
        }
    }

    fn render_slider(&self, frame: &mut Frame, area: Rect, theme: &Theme, slider: &Slider, focused: bool, label: String) {
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(slider.label())
                    .border_style(theme.border_style(focused)),
            )
            .gauge_style(theme.gauge_style(focused))
            .ratio(slider.ratio())
            .label(label);
        frame.render_widget(gauge, area);
    }

    fn status_line(&self, theme: &Theme) -> Option<Line<'static>> {
        let status = self.status.as_ref()?;
        let (style, prefix) = match status.kind {
            StatusKind::Info => (theme.info_style(), String::new()),
            StatusKind::Success => (theme.success_style(), "✓ ".to_string()),
            StatusKind::Error => (theme.error_style(), "✗ ".to_string()),
            StatusKind::Busy => (
                theme.warning_style(),
                format!("{} ", SPINNER_FRAMES[self.spinner_frame]),
            ),
        };
        Some(Line::from(Span::styled(format!("{}{}", prefix, status.text), style)))
    }
}

fn adjust_slider(slider: &mut Slider, event: KeyEvent) {
    match (event.code, event.modifiers) {
        (KeyCode::Left, _) | (KeyCode::Down, _) | (KeyCode::Char('h'), KeyModifiers::NONE) => {
            slider.decrease()
        }
        (KeyCode::Right, _) | (KeyCode::Up, _) | (KeyCode::Char('l'), KeyModifiers::NONE) => {
            slider.increase()
        }
        (KeyCode::Home, _) => slider.set(slider.spec().min),
        (KeyCode::End, _) => slider.set(slider.spec().max),
        _ => {}
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

impl Component for Sidebar {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" Model settings ", theme.title_style()))
            .border_style(theme.border_style(false));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Upload
                Constraint::Length(2), // Selected model
                Constraint::Length(3), // n_ctx
                Constraint::Length(3), // Temperature
                Constraint::Length(3), // Load button
                Constraint::Min(0),    // Status
            ])
            .split(inner);

        self.upload.render(frame, chunks[0], theme);

        let model_line = match &self.selected {
            Some(model) => Line::from(vec![
                Span::styled("Using model: ", theme.dim_style()),
                Span::styled(model.name.clone(), theme.info_style()),
            ]),
            None => Line::from(Span::styled("No model file selected", theme.placeholder_style())),
        };
        frame.render_widget(
            Paragraph::new(model_line).wrap(Wrap { trim: true }),
            chunks[1],
        );

        let context_label = format!("{}", self.context_size.value().round() as u32);
        self.render_slider(
            frame,
            chunks[2],
            theme,
            &self.context_size,
            self.focus == Some(SidebarFocus::ContextSize),
            context_label,
        );

        let temperature_label = format!("{:.2}", self.temperature.value());
        self.render_slider(
            frame,
            chunks[3],
            theme,
            &self.temperature,
            self.focus == Some(SidebarFocus::Temperature),
            temperature_label,
        );

        if self.selected.is_some() {
            let focused = self.focus == Some(SidebarFocus::LoadButton);
            let mut style = theme.text_style();
            if focused {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let button = Paragraph::new(Span::styled("Load / Reload model", style))
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(theme.border_style(focused)),
                );
            frame.render_widget(button, chunks[4]);
        }

        if let Some(line) = self.status_line(theme) {
            frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: true }), chunks[5]);
        }
    }

    fn has_focus(&self) -> bool {
        self.focus.is_some()
    }

    fn set_focus(&mut self, focus: bool) {
        self.set_focus_on(focus.then_some(SidebarFocus::Upload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn sidebar() -> Sidebar {
        Sidebar::new(GenerationSettings::default())
    }

    #[test]
    fn test_sliders_start_from_settings() {
        let sidebar = Sidebar::new(GenerationSettings {
            n_ctx: 1024,
            temperature: 0.5,
        });
        let settings = sidebar.settings();
        assert_eq!(settings.n_ctx, 1024);
        assert!((settings.temperature - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_slider_keys_adjust_only_focused_slider() {
        let mut sidebar = sidebar();
        sidebar.set_focus_on(Some(SidebarFocus::ContextSize));
        sidebar.handle_key(key(KeyCode::Right));
        sidebar.handle_key(key(KeyCode::Right));
        assert_eq!(sidebar.settings().n_ctx, 2560);
        assert!((sidebar.settings().temperature - 0.7).abs() < 1e-6);

        sidebar.set_focus_on(Some(SidebarFocus::Temperature));
        sidebar.handle_key(key(KeyCode::Left));
        assert!((sidebar.settings().temperature - 0.69).abs() < 1e-6);

        sidebar.handle_key(key(KeyCode::End));
        assert!((sidebar.settings().temperature - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_upload_submit_returns_path() {
        let mut sidebar = sidebar();
        sidebar.set_focus_on(Some(SidebarFocus::Upload));
        for c in "m.gguf".chars() {
            sidebar.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(
            sidebar.handle_key(key(KeyCode::Enter)),
            SidebarAction::Upload(PathBuf::from("m.gguf"))
        );
    }

    #[test]
    fn test_load_button_requires_selected_model() {
        let mut sidebar = sidebar();
        sidebar.set_focus_on(Some(SidebarFocus::LoadButton));
        assert_eq!(sidebar.handle_key(key(KeyCode::Enter)), SidebarAction::None);

        sidebar.select_model(StoredModel {
            name: "m.gguf".to_string(),
            path: PathBuf::from("models/m.gguf"),
            size: 1,
        });
        assert_eq!(sidebar.handle_key(key(KeyCode::Enter)), SidebarAction::Load);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("models/a.gguf"), PathBuf::from("models/a.gguf"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/a.gguf"), home.join("a.gguf"));
        }
    }

    #[test]
    fn test_spinner_advances_only_when_busy() {
        let mut sidebar = sidebar();
        sidebar.tick();
        assert_eq!(sidebar.spinner_frame, 0);

        sidebar.set_status(StatusKind::Busy, "Loading model...");
        sidebar.tick();
        assert_eq!(sidebar.spinner_frame, 1);
    }
}
