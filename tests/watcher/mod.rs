//! Watcher module tests.

mod end_to_end_test;
mod tailing_test;

/// Verify the watcher surface is exported from the library.
#[test]
fn test_all_watcher_types_exported() {
    use codex_session_watch::watcher::{
        extract_assistant_event, AssistantEvent, JsonlTailer, LineOutcome, SessionTracker,
        SessionWatcher, TickStats, WatchState, WatcherError,
    };

    let _ = JsonlTailer::with_offset(std::path::PathBuf::from("/tmp/x.jsonl"), 0);
    let _ = SessionTracker::new(std::path::PathBuf::from("/tmp"), 0);
    let _: AssistantEvent = extract_assistant_event("{}");
    let _ = TickStats::default();
    let _ = WatchState::Idle;
    let _ = LineOutcome::Ignored;
    let _: fn() -> WatcherError = || WatcherError::FileDeleted(std::path::PathBuf::new());
    let _: Option<&SessionWatcher> = None;
}
