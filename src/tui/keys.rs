use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Key binding configuration
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub label: &'static str,
    pub description: &'static str,
}

impl KeyBinding {
    pub const fn new(
        key: KeyCode,
        modifiers: KeyModifiers,
        label: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            modifiers,
            label,
            description,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.code && self.modifiers == event.modifiers
    }
}

/// Application key mappings
#[derive(Debug, Clone)]
pub struct KeyMap {
    /// Quit application
    pub quit: KeyBinding,

    /// Show help
    pub help: KeyBinding,

    /// Load or reload the selected model
    pub load: KeyBinding,

    /// Move focus forward
    pub next_focus: KeyBinding,

    /// Move focus backward
    pub prev_focus: KeyBinding,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            quit: KeyBinding::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL,
                "Ctrl+C",
                "Quit application",
            ),
            help: KeyBinding::new(
                KeyCode::Char('g'),
                KeyModifiers::CONTROL,
                "Ctrl+G",
                "Show/hide help",
            ),
            load: KeyBinding::new(
                KeyCode::Char('l'),
                KeyModifiers::CONTROL,
                "Ctrl+L",
                "Load / reload model",
            ),
            next_focus: KeyBinding::new(KeyCode::Tab, KeyModifiers::NONE, "Tab", "Next control"),
            prev_focus: KeyBinding::new(
                KeyCode::BackTab,
                KeyModifiers::SHIFT,
                "Shift+Tab",
                "Previous control",
            ),
        }
    }
}

impl KeyMap {
    /// Check if the event should quit the application
    pub fn should_quit(&self, event: &KeyEvent) -> bool {
        self.quit.matches(event)
    }

    /// Check if the event should show help
    pub fn should_show_help(&self, event: &KeyEvent) -> bool {
        self.help.matches(event)
    }

    pub fn should_load(&self, event: &KeyEvent) -> bool {
        self.load.matches(event)
    }

    pub fn is_next_focus(&self, event: &KeyEvent) -> bool {
        self.next_focus.matches(event)
    }

    /// Some terminals report Shift+Tab without the SHIFT modifier
    pub fn is_prev_focus(&self, event: &KeyEvent) -> bool {
        event.code == self.prev_focus.key
    }

    /// Get help text for all key bindings
    pub fn help_text(&self) -> String {
        let mut lines: Vec<String> = [
            &self.quit,
            &self.help,
            &self.load,
            &self.next_focus,
            &self.prev_focus,
        ]
        .iter()
        .map(|binding| format!("{:<10} {}", binding.label, binding.description))
        .collect();

        lines.push(format!("{:<10} {}", "←/→", "Adjust focused slider"));
        lines.push(format!("{:<10} {}", "Enter", "Import file / load / send"));
        lines.push(format!("{:<10} {}", "PgUp/PgDn", "Scroll chat history"));
        lines.join("\n")
    }
}
