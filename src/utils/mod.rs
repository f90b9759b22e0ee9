//! Small text helpers shared by the CLI and the TUI

pub mod text;
