//! External announcer invocation.
//!
//! The announcer is an opaque executable that receives one JSON argument
//! per assistant turn. It is launched fire-and-forget: the watcher never
//! waits on it or looks at its exit status.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;

use super::error::AnnounceError;

/// Event kind sent to the announcer.
pub const TURN_COMPLETE: &str = "agent-turn-complete";

/// Default announcer script name, looked up next to the watcher binary.
pub const DEFAULT_ANNOUNCER_NAME: &str = "codex-notify-tts.sh";

/// JSON payload passed as the announcer's only argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnComplete {
    /// Always [`TURN_COMPLETE`].
    #[serde(rename = "type")]
    pub kind: String,
    /// The announced assistant text.
    pub last_assistant_message: String,
    /// Working directory reported to the announcer.
    pub cwd: String,
}

impl TurnComplete {
    /// Create a turn-complete payload for `message`.
    #[must_use]
    pub fn new(message: impl Into<String>, cwd: &Path) -> Self {
        Self {
            kind: TURN_COMPLETE.to_string(),
            last_assistant_message: message.into(),
            cwd: cwd.to_string_lossy().into_owned(),
        }
    }
}

/// Something that can deliver a turn-complete notification.
///
/// Implementations must not block on the notification being handled.
pub trait Announcer: Send {
    /// Hand `payload` off for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be launched.
    fn announce(&mut self, payload: &TurnComplete) -> Result<(), AnnounceError>;
}

/// Launches the announcer executable as a detached child process.
#[derive(Debug, Clone)]
pub struct CommandAnnouncer {
    program: PathBuf,
    output_log: Option<PathBuf>,
}

impl CommandAnnouncer {
    /// Create an announcer that launches `program`.
    #[must_use]
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            output_log: None,
        }
    }

    /// Append the child's stdout and stderr to `path`.
    #[must_use]
    pub fn output_log(mut self, path: PathBuf) -> Self {
        self.output_log = Some(path);
        self
    }

    /// Get the announcer executable path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn output_stdio(&self) -> (Stdio, Stdio) {
        let Some(path) = &self.output_log else {
            return (Stdio::null(), Stdio::null());
        };

        let opened = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|out| Ok((out.try_clone()?, out)));
        match opened {
            Ok((out, err)) => (Stdio::from(out), Stdio::from(err)),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "Cannot open announcer output log, discarding output"
                );
                (Stdio::null(), Stdio::null())
            }
        }
    }
}

impl Announcer for CommandAnnouncer {
    fn announce(&mut self, payload: &TurnComplete) -> Result<(), AnnounceError> {
        let json = serde_json::to_string(payload)?;
        let (stdout, stderr) = self.output_stdio();

        let child = Command::new(&self.program)
            .arg(json)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| AnnounceError::from_spawn(&self.program, e))?;

        tracing::debug!(pid = ?child.id(), "Announcer launched");
        // Dropped without waiting; the runtime reaps it once it exits.
        drop(child);
        Ok(())
    }
}

/// Logs the payload instead of launching anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunAnnouncer;

impl Announcer for DryRunAnnouncer {
    fn announce(&mut self, payload: &TurnComplete) -> Result<(), AnnounceError> {
        let json = serde_json::to_string(payload)?;
        tracing::info!(payload = %json, "Dry run: announcement suppressed");
        Ok(())
    }
}

/// Resolve the announcer executable.
///
/// An explicit path wins; otherwise the default script next to the current
/// executable is used.
///
/// # Errors
///
/// Returns [`AnnounceError::NotFound`] if the resolved path is not a file.
pub fn resolve_announcer(explicit: Option<&Path>) -> Result<PathBuf, AnnounceError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_exe()?
            .parent()
            .map_or_else(|| PathBuf::from(DEFAULT_ANNOUNCER_NAME), |dir| {
                dir.join(DEFAULT_ANNOUNCER_NAME)
            }),
    };

    if path.is_file() {
        Ok(path)
    } else {
        Err(AnnounceError::NotFound(path))
    }
}
