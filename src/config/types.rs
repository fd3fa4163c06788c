//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the session watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Codex home directory; session logs live under `sessions/`.
    pub codex_home: PathBuf,
    /// Announcer executable. Defaults to the script next to the binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcer: Option<PathBuf>,
    /// Maximum number of session files tailed at once (0 = unbounded).
    pub max_files: usize,
    /// Write debug logs to `log_file`.
    pub debug: bool,
    /// Debug log and announcer output file.
    pub log_file: PathBuf,
    /// Skip launching the announcer; rate accounting still applies.
    pub dry_run: bool,
    /// Ignore messages stamped before this instant (epoch seconds).
    /// Defaults to the watcher's start time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<f64>,
    /// Announcements allowed per rolling hour.
    pub max_per_hour: u32,
    /// Minimum seconds between two announcements.
    pub min_seconds_between: u64,
    /// Single-instance lock file.
    pub lock_file: PathBuf,
    /// Persisted rate-limit timestamps.
    pub rate_state_file: PathBuf,
    /// Working directory reported to the announcer. Defaults to the cwd.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    /// Delay between poll ticks.
    pub poll_interval_ms: u64,
    /// Delay between session tree scans.
    pub rescan_interval_ms: u64,
    /// Delay used while no session files exist.
    pub idle_interval_ms: u64,
    /// Number of recent messages remembered for dedup.
    pub dedup_capacity: usize,
}

fn default_codex_home() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(".codex"), |home| home.join(".codex"))
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            codex_home: default_codex_home(),
            announcer: None,
            max_files: 0,
            debug: false,
            log_file: PathBuf::from("/tmp/codex-session-watch-tts.log"),
            dry_run: false,
            start_at: None,
            max_per_hour: 60,
            min_seconds_between: 5,
            lock_file: PathBuf::from("/tmp/codex-session-watch-tts.lock"),
            rate_state_file: PathBuf::from("/tmp/codex-tts-rate-state.txt"),
            base_dir: None,
            poll_interval_ms: 200,
            rescan_interval_ms: 2000,
            idle_interval_ms: 500,
            dedup_capacity: 50,
        }
    }
}

impl WatchConfig {
    /// Get the poll tick delay.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the session tree rescan delay.
    #[must_use]
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }

    /// Get the delay used while idle.
    #[must_use]
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    /// Directory reported to the announcer as `cwd`.
    #[must_use]
    pub fn announce_cwd(&self) -> PathBuf {
        self.base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
