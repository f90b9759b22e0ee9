//! Conversation view

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::Component;
use crate::{
    app::{ChatEvent, STREAMING_CURSOR},
    llm::{Message, MessageRole},
    tui::{styles::Theme, Frame},
};

/// Rendered conversation history plus the in-flight response
#[derive(Debug, Default)]
pub struct ChatView {
    messages: Vec<Message>,
    /// Partial assistant text while a response is streaming
    streaming: Option<String>,
    warning: Option<String>,
    /// Lines scrolled up from the bottom
    scroll_back: u16,
    /// Largest useful `scroll_back` from the last render
    max_scroll: u16,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the history with the visible messages of a session
    pub fn load_history<'a>(&mut self, messages: impl IntoIterator<Item = &'a Message>) {
        self.messages = messages
            .into_iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect();
        self.streaming = None;
        self.scroll_back = 0;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Apply one update from the chat loop
    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::UserMessage { content } => {
                self.warning = None;
                self.messages.push(Message::user(content));
            }
            ChatEvent::AssistantStarted => {
                self.streaming = Some(STREAMING_CURSOR.to_string());
            }
            ChatEvent::AssistantPartial { text } => {
                self.streaming = Some(text);
            }
            ChatEvent::AssistantFinished { content } => {
                self.streaming = None;
                self.messages.push(Message::assistant(content));
            }
            ChatEvent::Warning { message } => {
                self.warning = Some(message);
            }
        }
        // Follow new output
        self.scroll_back = 0;
    }

    /// Drop a half-finished response, e.g. after a generation error
    pub fn abort_streaming(&mut self) {
        self.streaming = None;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_add(lines).min(self.max_scroll);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    fn message_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let push_message = |lines: &mut Vec<Line<'static>>, role: MessageRole, text: &str| {
            let (label, style) = match role {
                MessageRole::User => ("You", theme.user_style()),
                _ => ("Assistant", theme.assistant_style()),
            };
            lines.push(Line::from(Span::styled(label, style)));
            for line in text.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), theme.text_style())));
            }
            lines.push(Line::from(""));
        };

        for message in &self.messages {
            push_message(&mut lines, message.role, &message.content);
        }
        if let Some(partial) = &self.streaming {
            push_message(&mut lines, MessageRole::Assistant, partial);
        }
        if let Some(warning) = &self.warning {
            lines.push(Line::from(Span::styled(format!("⚠ {}", warning), theme.warning_style())));
        }

        lines
    }
}

/// Rows a line occupies once wrapped to `width`
fn wrapped_height(line: &Line, width: u16) -> u16 {
    let width = width.max(1) as usize;
    let line_width: usize = line.spans.iter().map(|s| s.content.width()).sum();
    line_width.max(1).div_ceil(width) as u16
}

impl Component for ChatView {
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" Chat ", theme.title_style()))
            .border_style(theme.border_style(false));
        let inner = block.inner(area);

        let lines = if self.messages.is_empty() && self.streaming.is_none() && self.warning.is_none() {
            vec![Line::from(Span::styled(
                "Upload and load a model, then start chatting.",
                theme.placeholder_style(),
            ))]
        } else {
            self.message_lines(theme)
        };

        let total: u16 = lines
            .iter()
            .map(|line| wrapped_height(line, inner.width))
            .fold(0u16, |acc, h| acc.saturating_add(h));
        self.max_scroll = total.saturating_sub(inner.height);
        self.scroll_back = self.scroll_back.min(self.max_scroll);
        let offset = self.max_scroll - self.scroll_back;

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0));
        frame.render_widget(paragraph, area);
    }
}
