//! Working set of tailed session files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::discovery::discover_session_files;
use super::error::WatcherError;
use super::tailer::JsonlTailer;

/// Tracks which session files are watched and how far each has been read.
///
/// Tailers are created lazily on the first read of a path and never
/// dropped, so a file that falls out of the recency bound resumes from its
/// old offset if it comes back.
#[derive(Debug)]
pub struct SessionTracker {
    codex_home: PathBuf,
    max_files: usize,
    files: Vec<PathBuf>,
    tailers: HashMap<PathBuf, JsonlTailer>,
}

impl SessionTracker {
    /// Create a tracker for sessions under `codex_home`.
    #[must_use]
    pub fn new(codex_home: PathBuf, max_files: usize) -> Self {
        Self {
            codex_home,
            max_files,
            files: Vec::new(),
            tailers: HashMap::new(),
        }
    }

    /// Re-scan the session tree and replace the watched set.
    pub fn discover(&mut self) -> &[PathBuf] {
        self.files = discover_session_files(&self.codex_home, self.max_files);
        tracing::debug!(count = self.files.len(), "Scanned session files");
        &self.files
    }

    /// Files in the current watched set.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Whether `path` already has a read offset.
    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tailers.contains_key(path)
    }

    /// Read offset for `path`, if tracked.
    #[must_use]
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.tailers.get(path).map(JsonlTailer::offset)
    }

    /// Read bytes appended to `path` since the last call.
    ///
    /// The first call for a path records its end-of-file as the starting
    /// offset and returns nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub async fn read_new(&mut self, path: &Path) -> Result<Vec<u8>, WatcherError> {
        if let Some(tailer) = self.tailers.get_mut(path) {
            return tailer.read_new().await;
        }

        let tailer = JsonlTailer::at_end(path.to_path_buf()).await?;
        tracing::debug!(
            path = %path.display(),
            offset = tailer.offset(),
            "Tracking session file"
        );
        self.tailers.insert(path.to_path_buf(), tailer);
        Ok(Vec::new())
    }

    /// Read `path` and return the complete lines appended since the last call.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub async fn read_lines(&mut self, path: &Path) -> Result<Vec<String>, WatcherError> {
        let data = self.read_new(path).await?;
        Ok(self
            .tailers
            .get_mut(path)
            .map(|tailer| tailer.take_lines(&data))
            .unwrap_or_default())
    }
}
