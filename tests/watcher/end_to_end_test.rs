//! End-to-end watcher scenarios against real session files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use codex_session_watch::announce::{AnnounceError, Announcer, TurnComplete};
use codex_session_watch::config::WatchConfig;
use codex_session_watch::watcher::{LineOutcome, SessionWatcher};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct RecordingAnnouncer {
    calls: Arc<Mutex<Vec<TurnComplete>>>,
}

impl RecordingAnnouncer {
    fn messages(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.last_assistant_message.clone())
            .collect()
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&mut self, payload: &TurnComplete) -> Result<(), AnnounceError> {
        self.calls.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    session: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let session_dir = dir.path().join("sessions/2026/10/16");
        std::fs::create_dir_all(&session_dir).unwrap();
        let session = session_dir.join("rollout-2026-10-16T09-00-00-abc.jsonl");
        std::fs::write(
            &session,
            "{\"type\":\"session_meta\",\"payload\":{}}\n",
        )
        .unwrap();
        Self { dir, session }
    }

    fn config(&self) -> WatchConfig {
        WatchConfig {
            codex_home: self.dir.path().to_path_buf(),
            rate_state_file: self.dir.path().join("rate-state.txt"),
            lock_file: self.dir.path().join("watch.lock"),
            base_dir: Some(PathBuf::from("/work/project")),
            min_seconds_between: 0,
            ..WatchConfig::default()
        }
    }

    fn append(&self, text: &str) {
        append(&self.session, text);
    }
}

fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn response_line(role: &str, text: &str) -> String {
    format!(
        "{{\"type\":\"response_item\",\"payload\":{{\"type\":\"message\",\"role\":\"{role}\",\"content\":[{{\"type\":\"output_text\",\"text\":\"{text}\"}}]}},\"timestamp\":\"{}\"}}\n",
        now_iso()
    )
}

#[tokio::test]
async fn new_assistant_line_is_announced_once() {
    let fx = Fixture::new();
    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));

    // First tick only starts tracking; existing content is history.
    let stats = watcher.tick().await;
    assert_eq!(stats.files, 1);
    assert!(recorder.messages().is_empty());

    fx.append(&response_line("assistant", "Build finished"));
    watcher.tick().await;
    assert_eq!(recorder.messages(), vec!["Build finished"]);

    let calls = recorder.calls.lock().unwrap().clone();
    assert_eq!(calls[0].kind, "agent-turn-complete");
    assert_eq!(calls[0].cwd, "/work/project");
}

#[tokio::test]
async fn identical_line_is_deduplicated() {
    let fx = Fixture::new();
    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));
    watcher.tick().await;

    let line = response_line("assistant", "Build finished");
    fx.append(&line);
    watcher.tick().await;
    fx.append(&line);
    watcher.tick().await;

    assert_eq!(recorder.messages(), vec!["Build finished"]);
}

#[tokio::test]
async fn user_role_is_not_announced() {
    let fx = Fixture::new();
    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));
    watcher.tick().await;

    fx.append(&response_line("user", "Please build it"));
    let stats = watcher.tick().await;

    assert_eq!(stats.lines, 1);
    assert!(recorder.messages().is_empty());
}

#[tokio::test]
async fn history_present_at_startup_is_never_replayed() {
    let fx = Fixture::new();
    fx.append(&response_line("assistant", "Old answer"));

    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));
    watcher.tick().await;
    watcher.tick().await;

    assert!(recorder.messages().is_empty());
}

#[tokio::test]
async fn stale_timestamp_after_startup_is_filtered() {
    let fx = Fixture::new();
    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));
    watcher.tick().await;

    fx.append(
        "{\"type\":\"event_msg\",\"timestamp\":\"2020-01-01T00:00:00Z\",\"payload\":{\"type\":\"agent_message\",\"message\":\"buffered\"}}\n",
    );
    fx.append(
        "{\"type\":\"event_msg\",\"payload\":{\"type\":\"agent_message\",\"message\":\"untimed\"}}\n",
    );
    watcher.tick().await;

    assert_eq!(recorder.messages(), vec!["untimed"]);
}

#[tokio::test]
async fn line_split_across_ticks_is_announced_when_complete() {
    let fx = Fixture::new();
    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));
    watcher.tick().await;

    let line = response_line("assistant", "Split line");
    let (head, tail) = line.split_at(line.len() / 2);
    fx.append(head);
    watcher.tick().await;
    assert!(recorder.messages().is_empty());

    fx.append(tail);
    watcher.tick().await;
    assert_eq!(recorder.messages(), vec!["Split line"]);
}

#[tokio::test]
async fn malformed_lines_do_not_stop_other_files() {
    let fx = Fixture::new();
    let other = fx.dir.path().join("sessions/2026/10/16/rollout-other.jsonl");
    std::fs::write(&other, "").unwrap();

    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));
    watcher.tick().await;

    fx.append("{not json at all\n\u{0}\u{1}\n");
    append(&other, &response_line("assistant", "From the other file"));
    watcher.tick().await;

    assert_eq!(recorder.messages(), vec!["From the other file"]);
}

#[tokio::test]
async fn file_created_after_startup_is_picked_up_on_rescan() {
    let fx = Fixture::new();
    let cfg = WatchConfig {
        rescan_interval_ms: 0,
        ..fx.config()
    };
    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&cfg, Box::new(recorder.clone()));
    watcher.tick().await;

    let late = fx.dir.path().join("sessions/2026/10/17/rollout-late.jsonl");
    std::fs::create_dir_all(late.parent().unwrap()).unwrap();
    std::fs::write(&late, "").unwrap();

    let stats = watcher.tick().await;
    assert_eq!(stats.files, 2);
    assert!(watcher.tracker().is_tracked(&late));

    append(&late, &response_line("assistant", "Late session"));
    watcher.tick().await;
    assert_eq!(recorder.messages(), vec!["Late session"]);
}

#[tokio::test]
async fn vanished_file_is_skipped() {
    let fx = Fixture::new();
    let recorder = RecordingAnnouncer::default();
    let mut watcher = SessionWatcher::new(&fx.config(), Box::new(recorder.clone()));
    watcher.tick().await;

    std::fs::remove_file(&fx.session).unwrap();
    let stats = watcher.tick().await;
    assert_eq!(stats.read_errors, 1);
}

fn agent_line(text: &str) -> String {
    format!("{{\"type\":\"event_msg\",\"payload\":{{\"type\":\"agent_message\",\"message\":\"{text}\"}}}}")
}

#[test]
fn dry_run_filters_exactly_like_live_announcing() {
    let lines: Vec<String> = ["first", "second", "first", "noise", "third", "fourth", "fifth"]
        .iter()
        .map(|text| {
            if *text == "noise" {
                "{\"type\":\"session_meta\",\"payload\":{}}".to_string()
            } else {
                agent_line(text)
            }
        })
        .collect();

    let run = |watcher: &mut SessionWatcher| -> Vec<LineOutcome> {
        lines.iter().map(|line| watcher.process_line(line)).collect()
    };

    let dry = Fixture::new();
    let dry_config = WatchConfig {
        max_per_hour: 3,
        dry_run: true,
        ..dry.config()
    };
    let mut dry_watcher = SessionWatcher::from_config(&dry_config, PathBuf::new());

    let live = Fixture::new();
    let recorder = RecordingAnnouncer::default();
    let live_config = WatchConfig {
        max_per_hour: 3,
        ..live.config()
    };
    let mut live_watcher = SessionWatcher::new(&live_config, Box::new(recorder.clone()));

    let dry_outcomes = run(&mut dry_watcher);
    let live_outcomes = run(&mut live_watcher);

    assert_eq!(dry_outcomes, live_outcomes);
    assert_eq!(
        live_outcomes,
        vec![
            LineOutcome::Announced("first".to_string()),
            LineOutcome::Announced("second".to_string()),
            LineOutcome::Duplicate,
            LineOutcome::Ignored,
            LineOutcome::Announced("third".to_string()),
            LineOutcome::RateLimited,
            LineOutcome::RateLimited,
        ]
    );
    assert_eq!(recorder.messages(), vec!["first", "second", "third"]);
}
