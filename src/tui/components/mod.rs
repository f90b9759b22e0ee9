pub mod chat;
pub mod input;
pub mod sidebar;

use ratatui::layout::Rect;

use crate::tui::{styles::Theme, Frame};

/// Base trait for all UI components
pub trait Component {
    /// Render the component
    fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme);

    /// Check if component has focus
    fn has_focus(&self) -> bool {
        false
    }

    /// Set component focus
    fn set_focus(&mut self, focus: bool) {
        let _ = focus;
    }
}
