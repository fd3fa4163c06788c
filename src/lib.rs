//! Codex Session Watch - announces assistant turns from Codex session logs.

pub mod announce;
pub mod config;
pub mod lock;
pub mod watcher;
