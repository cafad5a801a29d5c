use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::SessionType;

/// Every state change the driver causes produces an Event.
/// The terminal UI renders them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_type: SessionType,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_type: SessionType,
        completed_work: u32,
        at: DateTime<Utc>,
    },
    /// Completed, but auto-start is off for the next type.
    AwaitingNext {
        next: SessionType,
        at: DateTime<Utc>,
    },
    SessionSkipped {
        from: Option<SessionType>,
        to: SessionType,
        at: DateTime<Utc>,
    },
    SessionReset {
        session_type: SessionType,
        at: DateTime<Utc>,
    },
    /// A notification or sound could not be delivered. Never fatal.
    NotifyFailed {
        message: String,
        at: DateTime<Utc>,
    },
    Quit {
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "session_started",
            Event::SessionPaused { .. } => "session_paused",
            Event::SessionResumed { .. } => "session_resumed",
            Event::SessionCompleted { .. } => "session_completed",
            Event::AwaitingNext { .. } => "awaiting_next",
            Event::SessionSkipped { .. } => "session_skipped",
            Event::SessionReset { .. } => "session_reset",
            Event::NotifyFailed { .. } => "notify_failed",
            Event::Quit { .. } => "quit",
        }
    }
}
