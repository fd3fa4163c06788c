//! Watcher module for Codex session files.
//!
//! Discovers session logs, tails them by byte offset, and extracts
//! assistant messages from newly written lines.

mod discovery;
mod error;
mod event;
mod session_watcher;
mod tailer;
mod tracker;

pub use discovery::{
    discover_session_files, find_session_files, most_recent, sessions_dir, SESSIONS_DIR,
};
pub use error::WatcherError;
pub use event::{extract_assistant_event, normalize_text, parse_timestamp, AssistantEvent};
pub use session_watcher::{LineOutcome, SessionWatcher, TickStats, WatchState};
pub use tailer::JsonlTailer;
pub use tracker::SessionTracker;
