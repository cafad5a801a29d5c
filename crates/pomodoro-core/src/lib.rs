//! # Pomodoro Core Library
//!
//! This library provides the core logic for the Pomodoro timer: a
//! countdown engine cycling through Work, Short Break and Long Break
//! sessions, plus the collaborators a front end needs around it.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a background countdown task per session, with every
//!   state transition serialized under one lock. Callers poll snapshots.
//! - **Session policy**: the pure "what comes next" rule of the cycle
//! - **Storage**: TOML-based configuration
//! - **Driver**: reacts to completions (notify, pick next, auto-start)
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`PomodoroState`]: Snapshot returned to callers
//! - [`Config`]: Application configuration management
//! - [`SessionDriver`]: Completion handling and key commands
//! - [`Notifier`]: Injected notification capability

pub mod driver;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use driver::{should_auto_start, Command, SessionDriver};
pub use error::{ConfigError, NotifyError};
pub use events::Event;
pub use notify::{Notifier, NullNotifier, SystemNotifier};
pub use storage::{Config, ConfigOverrides};
pub use timer::{
    DurationLookup, Durations, PomodoroState, Session, SessionType, TimerEngine, TimerState,
};
