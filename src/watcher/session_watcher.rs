//! Polling session watcher.
//!
//! Re-scans the session tree on a slow cadence, tails every watched file on
//! a fast one, and pushes fresh assistant messages through the start-time
//! filter, dedup window and rate limiter before announcing them.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::announce::{
    epoch_now, Announcer, CommandAnnouncer, DedupWindow, DryRunAnnouncer, RateLimiter,
    TurnComplete,
};
use crate::config::WatchConfig;

use super::event::extract_assistant_event;
use super::tracker::SessionTracker;

/// Characters of a message shown in log records.
const PREVIEW_CHARS: usize = 80;

/// Phase of the poll loop, used for tracing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchState {
    /// Sleeping between ticks.
    #[default]
    Idle,
    /// Rediscovering session files.
    Scanning,
    /// Tailing a session file.
    Reading,
    /// Handing a message to the announcer.
    Dispatching,
}

/// What happened to one session log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not an assistant message.
    Ignored,
    /// Stamped before the watcher started.
    BeforeStart,
    /// Announced recently.
    Duplicate,
    /// Denied by the rate limiter.
    RateLimited,
    /// Handed to the announcer.
    Announced(String),
    /// The announcer could not be launched.
    AnnounceFailed,
}

/// Counters for one poll tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Session files watched during the tick.
    pub files: usize,
    /// Complete lines read.
    pub lines: usize,
    /// Messages handed to the announcer.
    pub announced: usize,
    /// Files that could not be read.
    pub read_errors: usize,
}

/// Long-running watcher state, owned by the poll loop.
pub struct SessionWatcher {
    tracker: SessionTracker,
    dedup: DedupWindow,
    limiter: RateLimiter,
    announcer: Box<dyn Announcer>,
    start_epoch: f64,
    cwd: PathBuf,
    rescan_interval: Duration,
    poll_interval: Duration,
    idle_interval: Duration,
    last_scan: Option<Instant>,
    state: WatchState,
}

impl std::fmt::Debug for SessionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionWatcher")
            .field("tracker", &self.tracker)
            .field("start_epoch", &self.start_epoch)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionWatcher {
    /// Build a watcher from configuration with an explicit announcer.
    ///
    /// The start instant is `config.start_at` or the current time.
    #[must_use]
    pub fn new(config: &WatchConfig, announcer: Box<dyn Announcer>) -> Self {
        Self {
            tracker: SessionTracker::new(config.codex_home.clone(), config.max_files),
            dedup: DedupWindow::new(config.dedup_capacity),
            limiter: RateLimiter::new(
                config.max_per_hour,
                config.min_seconds_between,
                config.rate_state_file.clone(),
            ),
            announcer,
            start_epoch: config.start_at.unwrap_or_else(epoch_now),
            cwd: config.announce_cwd(),
            rescan_interval: config.rescan_interval(),
            poll_interval: config.poll_interval(),
            idle_interval: config.idle_interval(),
            last_scan: None,
            state: WatchState::Idle,
        }
    }

    /// Build a watcher whose announcer follows `config.dry_run`.
    #[must_use]
    pub fn from_config(config: &WatchConfig, announcer_program: PathBuf) -> Self {
        let announcer: Box<dyn Announcer> = if config.dry_run {
            Box::new(DryRunAnnouncer)
        } else {
            Box::new(CommandAnnouncer::new(announcer_program).output_log(config.log_file.clone()))
        };
        Self::new(config, announcer)
    }

    /// Messages stamped before this instant (epoch seconds) are dropped.
    #[must_use]
    pub fn start_epoch(&self) -> f64 {
        self.start_epoch
    }

    /// Get the current poll loop phase.
    #[must_use]
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Get the session file tracker.
    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    fn transition(&mut self, new_state: WatchState) {
        if self.state != new_state {
            tracing::trace!(from = ?self.state, to = ?new_state, "State transition");
            self.state = new_state;
        }
    }

    /// Run one poll cycle: rescan if due, then tail every watched file.
    pub async fn tick(&mut self) -> TickStats {
        let due = self
            .last_scan
            .map_or(true, |at| at.elapsed() >= self.rescan_interval);
        if due {
            self.transition(WatchState::Scanning);
            self.tracker.discover();
            self.last_scan = Some(Instant::now());
        }

        let mut stats = TickStats {
            files: self.tracker.files().len(),
            ..TickStats::default()
        };

        let files = self.tracker.files().to_vec();
        for path in files {
            self.transition(WatchState::Reading);
            let lines = match self.tracker.read_lines(&path).await {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Error reading session file");
                    stats.read_errors += 1;
                    continue;
                }
            };

            for line in lines {
                stats.lines += 1;
                if let LineOutcome::Announced(msg) = self.process_line(&line) {
                    tracing::debug!(
                        file = %path.file_name().unwrap_or_default().to_string_lossy(),
                        message = %preview(&msg),
                        "Assistant message announced"
                    );
                    stats.announced += 1;
                }
            }
        }

        self.transition(WatchState::Idle);
        stats
    }

    /// Run one line through extraction, filtering and dispatch.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        let event = extract_assistant_event(line);
        let Some(message) = event.message else {
            return LineOutcome::Ignored;
        };

        if event.timestamp.is_some_and(|ts| ts < self.start_epoch) {
            tracing::debug!(message = %preview(&message), "Skipping pre-start message");
            return LineOutcome::BeforeStart;
        }

        if !self.dedup.remember(&message) {
            tracing::debug!(message = %preview(&message), "Skipping duplicate message");
            return LineOutcome::Duplicate;
        }

        if !self.limiter.allow() {
            return LineOutcome::RateLimited;
        }

        self.transition(WatchState::Dispatching);
        let payload = TurnComplete::new(message.clone(), &self.cwd);
        match self.announcer.announce(&payload) {
            Ok(()) => LineOutcome::Announced(message),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to launch announcer");
                LineOutcome::AnnounceFailed
            }
        }
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        tracing::info!(start_epoch = self.start_epoch, "Session watcher started");

        loop {
            let stats = self.tick().await;
            let pause = if stats.files == 0 {
                self.idle_interval
            } else {
                self.poll_interval
            };

            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::info!("Session watcher shutting down");
                    break;
                }
                () = tokio::time::sleep(pause) => {}
            }
        }
    }
}

/// First [`PREVIEW_CHARS`] characters of `message`.
fn preview(message: &str) -> &str {
    match message.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}
