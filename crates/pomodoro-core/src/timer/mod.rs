mod engine;
mod session;

pub use engine::{DurationLookup, Durations, TimerEngine, DEFAULT_TICK};
pub use session::{PomodoroState, Session, SessionType, TimerState};
