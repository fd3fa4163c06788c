//! Announcer error types.

use std::path::PathBuf;

/// Errors that can occur when launching the announcer.
#[derive(thiserror::Error, Debug)]
pub enum AnnounceError {
    /// The announcer executable was not found.
    #[error("Announcer not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when spawning.
    #[error("Permission denied spawning announcer: {0}")]
    PermissionDenied(PathBuf),

    /// Payload could not be encoded.
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnnounceError {
    /// Create an `AnnounceError` from a spawn failure, classifying common cases.
    pub(crate) fn from_spawn(program: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}
