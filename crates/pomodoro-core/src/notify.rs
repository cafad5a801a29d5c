//! Session-complete notifications.
//!
//! The driver only sees the [`Notifier`] trait; [`SystemNotifier`] shells
//! out to the platform helper and [`NullNotifier`] does nothing.

use std::io::Write;
use std::process::Command;

use crate::error::NotifyError;
use crate::timer::SessionType;

const TITLE: &str = "Pomodoro";

/// Capability for telling the user a session finished.
pub trait Notifier: Send + Sync {
    fn session_complete(&self, session_type: SessionType) -> Result<(), NotifyError>;
    fn play_sound(&self) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn session_complete(&self, _session_type: SessionType) -> Result<(), NotifyError> {
        Ok(())
    }

    fn play_sound(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Available notification backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// macOS osascript / afplay
    Osascript,
    /// Linux notify-send
    NotifySend,
    /// Terminal bell
    Bell,
}

impl Backend {
    /// Pick the backend for the current platform
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Backend::Osascript
        } else if cfg!(target_os = "linux") {
            Backend::NotifySend
        } else {
            Backend::Bell
        }
    }
}

/// Desktop notifications through the platform helper program.
#[derive(Debug, Clone, Copy)]
pub struct SystemNotifier {
    backend: Backend,
}

impl SystemNotifier {
    pub fn new() -> Self {
        Self::with_backend(Backend::detect())
    }

    pub fn with_backend(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl Default for SystemNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for SystemNotifier {
    fn session_complete(&self, session_type: SessionType) -> Result<(), NotifyError> {
        let message = completion_message(session_type);
        match self.backend {
            Backend::Osascript => {
                let script = format!(
                    "display notification \"{}\" with title \"{}\"",
                    escape_applescript(&message),
                    TITLE
                );
                run("osascript", &["-e", &script])
            }
            Backend::NotifySend => run("notify-send", &[TITLE, &message]),
            Backend::Bell => bell(),
        }
    }

    fn play_sound(&self) -> Result<(), NotifyError> {
        match self.backend {
            Backend::Osascript => run("afplay", &["/System/Library/Sounds/Glass.aiff"]),
            Backend::NotifySend | Backend::Bell => bell(),
        }
    }
}

pub fn completion_message(session_type: SessionType) -> String {
    format!("{session_type} completed")
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn run(program: &str, args: &[&str]) -> Result<(), NotifyError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| NotifyError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(NotifyError::Failed {
            program: program.to_string(),
            status: status.to_string(),
        })
    }
}

fn bell() -> Result<(), NotifyError> {
    let mut out = std::io::stdout();
    out.write_all(b"\x07")
        .and_then(|()| out.flush())
        .map_err(|source| NotifyError::Spawn {
            program: "bell".into(),
            source,
        })
}
