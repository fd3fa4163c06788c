//! Session path discovery utilities.
//!
//! Provides functions to locate Codex session files on disk.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Directory under the Codex home that holds session logs.
pub const SESSIONS_DIR: &str = "sessions";

/// Find the sessions directory under a Codex home.
///
/// Codex nests session logs by date, e.g.
/// `~/.codex/sessions/YYYY/MM/DD/rollout-<id>.jsonl`.
#[must_use]
pub fn sessions_dir(codex_home: &Path) -> PathBuf {
    codex_home.join(SESSIONS_DIR)
}

/// Recursively list every `.jsonl` file under `root`.
///
/// Unreadable entries are skipped. A missing root yields an empty list.
/// The result is sorted by path.
#[must_use]
pub fn find_session_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();
    files
}

/// Keep only the `max_files` most recently modified paths.
///
/// `0` means unbounded. Ties on modification time are broken by path.
/// Files whose modification time cannot be read are dropped when trimming.
#[must_use]
pub fn most_recent(files: Vec<PathBuf>, max_files: usize) -> Vec<PathBuf> {
    if max_files == 0 || files.len() <= max_files {
        return files;
    }

    let mut with_mtime: Vec<(SystemTime, PathBuf)> = files
        .into_iter()
        .filter_map(|path| {
            let modified = std::fs::metadata(&path).ok()?.modified().ok()?;
            Some((modified, path))
        })
        .collect();

    with_mtime.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    with_mtime
        .into_iter()
        .take(max_files)
        .map(|(_, path)| path)
        .collect()
}

/// Discover the session files worth watching under a Codex home.
///
/// Convenience function that combines [`find_session_files`] and
/// [`most_recent`].
#[must_use]
pub fn discover_session_files(codex_home: &Path, max_files: usize) -> Vec<PathBuf> {
    most_recent(find_session_files(&sessions_dir(codex_home)), max_files)
}
