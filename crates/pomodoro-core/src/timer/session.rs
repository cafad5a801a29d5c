use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of session; selects which configured duration applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Work)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionType::Work => "Work",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        };
        f.write_str(name)
    }
}

/// Lifecycle of the engine, independent of the session type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// One countdown instance.
///
/// `remaining` is decremented by the engine one tick at a time and always
/// stays within `0..=duration`. The timestamps are bookkeeping only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_type: SessionType,
    pub duration: Duration,
    pub remaining: Duration,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(session_type: SessionType, duration: Duration) -> Self {
        Self {
            session_type,
            duration,
            remaining: duration,
            started_at: Utc::now(),
            paused_at: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.duration.saturating_sub(self.remaining)
    }

    /// 0.0 .. 1.0 progress within the session.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        1.0 - self.remaining.as_secs_f64() / self.duration.as_secs_f64()
    }
}

/// Aggregate owned by the engine. Callers only ever see copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomodoroState {
    pub current_session: Option<Session>,
    /// Work sessions that fully elapsed. Never reset.
    pub completed_work: u32,
    pub timer_state: TimerState,
}

impl Default for PomodoroState {
    fn default() -> Self {
        Self {
            current_session: None,
            completed_work: 0,
            timer_state: TimerState::Idle,
        }
    }
}

impl PomodoroState {
    /// Decide which session should follow the current one.
    ///
    /// After a Work session the in-flight session is counted as complete
    /// (`completed_work + 1`), so call this with the state from *before* the
    /// completion is recorded when deciding ahead of time. Every
    /// `sessions_until_long`-th Work session is followed by a long break.
    ///
    /// `sessions_until_long` must be at least 1.
    pub fn next_session_type(&self, sessions_until_long: u32) -> SessionType {
        debug_assert!(sessions_until_long >= 1, "cycle length must be positive");

        match &self.current_session {
            Some(session) if session.session_type == SessionType::Work => {
                let cycle = sessions_until_long.max(1);
                if (self.completed_work + 1) % cycle == 0 {
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                }
            }
            _ => SessionType::Work,
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.current_session.as_ref().map(|s| s.remaining)
    }
}
