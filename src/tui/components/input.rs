//! Single-line text input

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use super::Component;
use crate::tui::{styles::Theme, Frame};

/// Result of feeding a key to an input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Key was consumed (or ignored) without submitting
    None,

    /// Enter pressed on non-blank content; the input has been cleared
    Submit(String),
}

/// Text box with a cursor, used for the upload path and the chat prompt
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    title: String,
    placeholder: String,
    content: String,
    /// Cursor position counted in chars
    cursor: usize,
    focused: bool,
    clear_on_submit: bool,
}

impl TextInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            clear_on_submit: true,
            ..Default::default()
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Keep the text after Enter instead of clearing it
    pub fn keep_on_submit(mut self) -> Self {
        self.clear_on_submit = false;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor = self.content.chars().count();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn insert_char(&mut self, c: char) {
        let index = self.byte_index();
        self.content.insert(index, c);
        self.cursor += 1;
    }

    fn delete_previous_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let index = self.byte_index();
        self.content.remove(index);
    }

    fn delete_char(&mut self) {
        if self.cursor < self.content.chars().count() {
            let index = self.byte_index();
            self.content.remove(index);
        }
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| !c.is_control()) {
            self.insert_char(c);
        }
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> InputAction {
        match (event.code, event.modifiers) {
            (KeyCode::Enter, _) => {
                let text = self.content.trim().to_string();
                if text.is_empty() {
                    return InputAction::None;
                }
                if self.clear_on_submit {
                    self.clear();
                }
                return InputAction::Submit(text);
            }
            (KeyCode::Char(c), KeyModifiers::NONE) | (KeyCode::Char(c), KeyModifiers::SHIFT) => {
                self.insert_char(c)
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.clear(),
            (KeyCode::Backspace, _) => self.delete_previous_char(),
            (KeyCode::Delete, _) => self.delete_char(),
            (KeyCode::Left, _) => self.cursor = self.cursor.saturating_sub(1),
            (KeyCode::Right, _) => {
                self.cursor = (self.cursor + 1).min(self.content.chars().count())
            }
            (KeyCode::Home, _) => self.cursor = 0,
            (KeyCode::End, _) => self.cursor = self.content.chars().count(),
            _ => {}
        }
        InputAction::None
    }

    /// Display width of the text left of the cursor
    fn cursor_column(&self) -> u16 {
        let before: String = self.content.chars().take(self.cursor).collect();
        before.width() as u16
    }
}

impl Component for TextInput {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title.as_str())
            .border_style(theme.border_style(self.focused));

        let inner_width = area.width.saturating_sub(2);
        let cursor_column = self.cursor_column();
        // Scroll horizontally so the cursor stays visible
        let offset = cursor_column.saturating_sub(inner_width.saturating_sub(1));

        let line = if self.content.is_empty() {
            Line::from(Span::styled(self.placeholder.as_str(), theme.placeholder_style()))
        } else {
            Line::from(Span::styled(self.content.as_str(), theme.text_style()))
        };

        let paragraph = Paragraph::new(line).block(block).scroll((0, offset));
        frame.render_widget(paragraph, area);

        if self.focused && area.width > 2 && area.height > 2 {
            frame.set_cursor(area.x + 1 + cursor_column - offset, area.y + 1);
        }
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn set_focus(&mut self, focus: bool) {
        self.focused = focus;
    }
}
