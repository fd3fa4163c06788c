//! Announcement gating and dispatch.
//!
//! Holds the dedup window, the persistent rate limiter, and the announcer
//! that turns an assistant message into an external notification.

mod announcer;
mod dedup;
mod error;
mod rate;

pub use announcer::{
    resolve_announcer, Announcer, CommandAnnouncer, DryRunAnnouncer, TurnComplete,
    DEFAULT_ANNOUNCER_NAME, TURN_COMPLETE,
};
pub use dedup::{DedupWindow, DEFAULT_DEDUP_CAPACITY};
pub use error::AnnounceError;
pub use rate::{
    epoch_now, read_rate_state, write_rate_state, RateLimiter, MAX_RETAINED_STAMPS,
    RATE_WINDOW_SECS,
};
