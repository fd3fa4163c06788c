//! Persistent notification rate limiting.
//!
//! Allowed notifications are recorded as epoch seconds, one per line, in a
//! small state file so the hourly cap survives restarts.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of the sliding window, in seconds.
pub const RATE_WINDOW_SECS: f64 = 3600.0;

/// Most timestamps kept in the state file.
pub const MAX_RETAINED_STAMPS: usize = 2000;

/// Current wall-clock time as epoch seconds.
#[must_use]
pub fn epoch_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Load timestamps newer than `now - window_secs` from the state file.
///
/// A missing or unreadable file is treated as empty; lines that do not
/// parse as numbers are skipped.
#[must_use]
pub fn read_rate_state(path: &Path, now: f64, window_secs: f64) -> Vec<f64> {
    let Ok(bytes) = fs::read(path) else {
        return Vec::new();
    };
    let content = String::from_utf8_lossy(&bytes);

    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(MAX_RETAINED_STAMPS);

    let cutoff = now - window_secs;
    lines[start..]
        .iter()
        .filter_map(|l| l.parse::<f64>().ok())
        .filter(|t| *t >= cutoff)
        .collect()
}

/// Atomically replace the state file with `stamps`.
///
/// Writes a sibling `.tmp` file and renames it over the target. Only the
/// newest [`MAX_RETAINED_STAMPS`] entries are written.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or renamed.
pub fn write_rate_state(path: &Path, stamps: &[f64]) -> std::io::Result<()> {
    let temp_path = temp_path(path);
    let start = stamps.len().saturating_sub(MAX_RETAINED_STAMPS);

    let mut content = String::new();
    for stamp in &stamps[start..] {
        content.push_str(&stamp.to_string());
        content.push('\n');
    }

    let result = fs::write(&temp_path, content).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Limits announcements by minimum spacing and a sliding hourly cap.
///
/// Spacing is tracked in memory for this process only; the hourly count
/// is read from and written to the state file on every allowed call.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_per_hour: u32,
    min_seconds_between: u64,
    state_file: PathBuf,
    last_allowed: Option<f64>,
}

impl RateLimiter {
    /// Create a limiter persisting its timestamps to `state_file`.
    #[must_use]
    pub fn new(max_per_hour: u32, min_seconds_between: u64, state_file: PathBuf) -> Self {
        Self {
            max_per_hour,
            min_seconds_between,
            state_file,
            last_allowed: None,
        }
    }

    /// Decide whether a notification may go out now, recording it if so.
    pub fn allow(&mut self) -> bool {
        self.allow_at(epoch_now())
    }

    /// Decide whether a notification may go out at `now`, recording it if so.
    ///
    /// The state file is updated before returning `true`, whether or not the
    /// caller ends up dispatching.
    #[allow(clippy::cast_precision_loss)]
    pub fn allow_at(&mut self, now: f64) -> bool {
        if self.max_per_hour == 0 {
            return false;
        }

        if self.min_seconds_between > 0 {
            if let Some(last) = self.last_allowed {
                if now - last < self.min_seconds_between as f64 {
                    tracing::debug!(
                        since_last = now - last,
                        min_seconds_between = self.min_seconds_between,
                        "Rate limited: too soon after last announcement"
                    );
                    return false;
                }
            }
        }

        let mut stamps = read_rate_state(&self.state_file, now, RATE_WINDOW_SECS);
        if stamps.len() >= self.max_per_hour as usize {
            tracing::debug!(
                count = stamps.len(),
                max_per_hour = self.max_per_hour,
                "Rate limited: hourly cap reached"
            );
            return false;
        }

        stamps.push(now);
        if let Err(e) = write_rate_state(&self.state_file, &stamps) {
            tracing::warn!(
                path = %self.state_file.display(),
                error = %e,
                "Failed to persist rate state"
            );
        }
        self.last_allowed = Some(now);
        true
    }

    /// Path of the persisted state file.
    #[must_use]
    pub fn state_file(&self) -> &Path {
        &self.state_file
    }
}
