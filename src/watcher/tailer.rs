//! Incremental JSONL file tailer.
//!
//! Reads bytes appended to a session file since the last read and
//! reassembles them into complete lines.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::WatcherError;

/// Incremental reader that tracks the read position of one file.
///
/// The offset only ever moves forward. Bytes after the last line feed are
/// held back as carry-over until the rest of the line arrives.
#[derive(Debug)]
pub struct JsonlTailer {
    /// Path to the JSONL file.
    path: PathBuf,
    /// Bytes already consumed.
    offset: u64,
    /// Trailing bytes of an unterminated line from the previous read.
    carry: Vec<u8>,
}

impl JsonlTailer {
    /// Create a tailer starting at a specific offset.
    #[must_use]
    pub fn with_offset(path: PathBuf, offset: u64) -> Self {
        Self {
            path,
            offset,
            carry: Vec::new(),
        }
    }

    /// Create a tailer positioned at the current end of the file.
    ///
    /// Existing content is never replayed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub async fn at_end(path: PathBuf) -> Result<Self, WatcherError> {
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| WatcherError::from_open(&path, e))?;
        Ok(Self::with_offset(path, metadata.len()))
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length of the pending partial line.
    #[must_use]
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    /// Read the bytes appended since the last read.
    ///
    /// Returns an empty buffer if the file has not grown. A file that shrank
    /// below the stored offset also yields nothing until it grows past it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened (deleted, permission
    /// denied) or an I/O error occurs during reading.
    pub async fn read_new(&mut self) -> Result<Vec<u8>, WatcherError> {
        let mut file = File::open(&self.path)
            .await
            .map_err(|e| WatcherError::from_open(&self.path, e))?;

        let file_len = file.metadata().await?.len();
        if file_len < self.offset {
            tracing::debug!(
                path = %self.path.display(),
                offset = self.offset,
                len = file_len,
                "File shorter than read offset, waiting for growth"
            );
            return Ok(Vec::new());
        }
        if file_len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(std::io::SeekFrom::Start(self.offset)).await?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        self.offset += data.len() as u64;

        Ok(data)
    }

    /// Join `data` onto the carried-over fragment and split out complete lines.
    ///
    /// The final fragment is kept as carry-over unless the combined buffer
    /// ends with a line feed. Empty lines are dropped.
    pub fn take_lines(&mut self, data: &[u8]) -> Vec<String> {
        if data.is_empty() {
            return Vec::new();
        }

        let mut buffer = std::mem::take(&mut self.carry);
        buffer.extend_from_slice(data);

        let mut parts: Vec<&[u8]> = buffer.split(|b| *b == b'\n').collect();
        // split() always yields a trailing fragment, empty when the buffer
        // ended with a line feed.
        let tail = parts.pop().unwrap_or_default();
        let carry = tail.to_vec();

        let lines = parts
            .into_iter()
            .filter(|raw| !raw.is_empty())
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .collect();

        self.carry = carry;
        lines
    }

    /// Read new bytes and return the complete lines they finish.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`JsonlTailer::read_new`].
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>, WatcherError> {
        let data = self.read_new().await?;
        Ok(self.take_lines(&data))
    }
}
