//! Per-session state
//!
//! A session owns its message history and, at most, one loaded model handle.
//! Sessions never share mutable state with each other.

mod state;
mod store;

pub use state::*;
pub use store::*;
