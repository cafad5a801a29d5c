//! Session cycle driver.
//!
//! Sits between a polling UI and the [`TimerEngine`]: it turns key commands
//! into engine calls and, when a session completes, notifies the user and
//! picks (and optionally starts) the next session of the cycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::events::Event;
use crate::notify::Notifier;
use crate::storage::Config;
use crate::timer::{PomodoroState, SessionType, TimerEngine, TimerState};

/// User commands, one per key in the terminal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Skip,
    Reset,
    Quit,
}

/// Whether `next` should begin without user input.
pub fn should_auto_start(config: &Config, next: SessionType) -> bool {
    match next {
        SessionType::Work => config.auto_start_work,
        SessionType::ShortBreak | SessionType::LongBreak => config.auto_start_breaks,
    }
}

/// Next session type for the cycle, looking past a completion the engine
/// has already counted.
fn upcoming_session_type(state: &PomodoroState, sessions_until_long: u32) -> SessionType {
    let counted_work = state.timer_state == TimerState::Completed
        && state
            .current_session
            .as_ref()
            .is_some_and(|s| s.session_type == SessionType::Work);
    if !counted_work {
        return state.next_session_type(sessions_until_long);
    }
    let before = PomodoroState {
        completed_work: state.completed_work.saturating_sub(1),
        ..state.clone()
    };
    before.next_session_type(sessions_until_long)
}

pub struct SessionDriver<N: Notifier> {
    engine: Arc<TimerEngine>,
    config: Config,
    notifier: N,
    prev_state: TimerState,
}

impl<N: Notifier> SessionDriver<N> {
    pub fn new(engine: Arc<TimerEngine>, config: Config, notifier: N) -> Self {
        Self {
            engine,
            config,
            notifier,
            prev_state: TimerState::Idle,
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start the first Work session.
    pub fn begin(&mut self) -> Event {
        self.start(SessionType::Work)
    }

    /// Sample the engine; react once to each transition into Completed.
    pub fn poll(&mut self) -> Vec<Event> {
        let state = self.engine.state();
        let entered_completed =
            state.timer_state == TimerState::Completed && self.prev_state != TimerState::Completed;
        self.prev_state = state.timer_state;
        if !entered_completed {
            return Vec::new();
        }
        let Some(session) = state.current_session.as_ref() else {
            return Vec::new();
        };

        let mut events = vec![Event::SessionCompleted {
            session_type: session.session_type,
            completed_work: state.completed_work,
            at: Utc::now(),
        }];
        events.extend(self.announce(session.session_type));

        let next = upcoming_session_type(&state, self.config.sessions_until_long());
        if should_auto_start(&self.config, next) {
            events.push(self.start(next));
            // The restarted engine is Running, but this completion is handled.
            self.prev_state = TimerState::Completed;
        } else {
            info!(%next, "waiting for user to start next session");
            events.push(Event::AwaitingNext { next, at: Utc::now() });
        }
        events
    }

    pub fn handle(&mut self, command: Command) -> Vec<Event> {
        let state = self.engine.state();
        debug!(?command, timer_state = ?state.timer_state, "command");

        let events = match command {
            Command::TogglePause => match state.timer_state {
                TimerState::Running => {
                    self.engine.pause();
                    vec![Event::SessionPaused {
                        remaining_ms: remaining_ms(&self.engine.state()),
                        at: Utc::now(),
                    }]
                }
                TimerState::Paused => {
                    self.engine.resume();
                    vec![Event::SessionResumed {
                        remaining_ms: remaining_ms(&self.engine.state()),
                        at: Utc::now(),
                    }]
                }
                TimerState::Idle | TimerState::Completed => Vec::new(),
            },
            Command::Skip => {
                let next = upcoming_session_type(&state, self.config.sessions_until_long());
                self.engine.stop();
                let from = state.current_session.as_ref().map(|s| s.session_type);
                let started = self.start(next);
                vec![
                    Event::SessionSkipped {
                        from,
                        to: next,
                        at: Utc::now(),
                    },
                    started,
                ]
            }
            Command::Reset => match state.current_session.as_ref() {
                Some(session) => {
                    let session_type = session.session_type;
                    self.engine.stop();
                    self.engine.start(session_type);
                    vec![Event::SessionReset {
                        session_type,
                        at: Utc::now(),
                    }]
                }
                None => Vec::new(),
            },
            Command::Quit => {
                self.engine.stop();
                vec![Event::Quit { at: Utc::now() }]
            }
        };
        // A no-op command must not swallow a completion poll() has yet to see.
        if !events.is_empty() {
            self.prev_state = self.engine.state().timer_state;
        }
        events
    }

    fn start(&mut self, session_type: SessionType) -> Event {
        self.engine.start(session_type);
        Event::SessionStarted {
            session_type,
            duration_secs: self.engine.duration_for(session_type).as_secs(),
            at: Utc::now(),
        }
    }

    fn announce(&self, session_type: SessionType) -> Vec<Event> {
        let mut failures = Vec::new();
        if self.config.notify_enabled {
            if let Err(e) = self.notifier.session_complete(session_type) {
                warn!(error = %e, "notification failed");
                failures.push(format!("Notification failed: {e}"));
            }
        }
        if self.config.sound_enabled {
            if let Err(e) = self.notifier.play_sound() {
                warn!(error = %e, "sound playback failed");
                failures.push(format!("Sound playback failed: {e}"));
            }
        }
        failures
            .into_iter()
            .map(|message| Event::NotifyFailed {
                message,
                at: Utc::now(),
            })
            .collect()
    }
}

fn remaining_ms(state: &PomodoroState) -> u64 {
    state
        .remaining()
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
