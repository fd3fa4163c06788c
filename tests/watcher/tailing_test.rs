//! Offset and carry-over behaviour of the session tracker.

use std::io::Write;

use codex_session_watch::watcher::{JsonlTailer, SessionTracker};
use tempfile::TempDir;

fn append(path: &std::path::Path, bytes: &[u8]) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(bytes).unwrap();
}

#[tokio::test]
async fn growth_bytes_returned_exactly_once_for_any_split() {
    let payload: &[u8] = b"{\"a\":1}\n{\"b\":\"two words\"}\n\n{\"c\":3}\ntrailing";

    for chunk_size in 1..=payload.len() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        append(&path, b"history that must be skipped\n");

        let mut tracker = SessionTracker::new(dir.path().to_path_buf(), 0);
        assert!(tracker.read_new(&path).await.unwrap().is_empty());

        let mut collected = Vec::new();
        for chunk in payload.chunks(chunk_size) {
            append(&path, chunk);
            collected.extend(tracker.read_new(&path).await.unwrap());
        }
        collected.extend(tracker.read_new(&path).await.unwrap());

        assert_eq!(collected, payload, "chunk size {chunk_size}");
    }
}

#[tokio::test]
async fn lines_reassembled_for_any_split() {
    let payload: &[u8] = b"first line\nsecond line\nthird";

    for chunk_size in 1..=payload.len() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.jsonl");
        append(&path, b"");

        let mut tracker = SessionTracker::new(dir.path().to_path_buf(), 0);
        tracker.read_lines(&path).await.unwrap();

        let mut lines = Vec::new();
        for chunk in payload.chunks(chunk_size) {
            append(&path, chunk);
            lines.extend(tracker.read_lines(&path).await.unwrap());
        }
        assert_eq!(lines, vec!["first line", "second line"], "chunk size {chunk_size}");

        append(&path, b" line\n");
        assert_eq!(tracker.read_lines(&path).await.unwrap(), vec!["third line"]);
    }
}

#[tokio::test]
async fn tailer_offset_never_decreases() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s.jsonl");
    append(&path, b"0123456789\n");

    let mut tailer = JsonlTailer::at_end(path.clone()).await.unwrap();
    let mut last = tailer.offset();

    append(&path, b"more\n");
    tailer.read_new().await.unwrap();
    assert!(tailer.offset() > last);
    last = tailer.offset();

    std::fs::write(&path, b"short\n").unwrap();
    tailer.read_new().await.unwrap();
    assert_eq!(tailer.offset(), last);
}
