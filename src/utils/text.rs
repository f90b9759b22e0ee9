//! Text manipulation and formatting utilities

/// String and text manipulation utilities
pub mod string {
    /// Truncate text to a number of characters, marking the cut with an ellipsis
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else if max_chars <= 3 {
            "...".to_string()
        } else {
            let head: String = text.chars().take(max_chars - 3).collect();
            format!("{}...", head)
        }
    }
}

/// Text formatting utilities
pub mod format {
    use std::time::Duration;

    /// Human-readable duration at millisecond precision, e.g. `1s 250ms`
    pub fn format_elapsed(elapsed: Duration) -> String {
        let millis = Duration::from_millis(elapsed.as_millis() as u64);
        humantime::format_duration(millis).to_string()
    }

    /// Format file size in human-readable format
    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        }
    }
}
