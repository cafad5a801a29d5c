//! Raw-mode terminal output and key mapping.

use std::io::{self, Write};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{self, ClearType};
use crossterm::{execute, queue};

use pomodoro_core::storage::format_duration;
use pomodoro_core::{Command, Config, Event, PomodoroState, TimerState};

const BAR_WIDTH: usize = 30;

/// Raw mode for the lifetime of the guard.
pub struct RawMode;

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("failed to restore terminal: {e}");
        }
        println!();
    }
}

/// Raw mode needs an explicit carriage return.
fn print_line(s: &str) {
    let mut out = io::stdout();
    let _ = execute!(out, terminal::Clear(ClearType::CurrentLine));
    print!("\r{s}\r\n");
    let _ = out.flush();
}

pub fn command_for_key(key: &KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char(' ') => Some(Command::TogglePause),
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('s' | 'S') => Some(Command::Skip),
        KeyCode::Char('r' | 'R') => Some(Command::Reset),
        _ => None,
    }
}

pub fn show_welcome(config: &Config) {
    print_line("🍅 Pomodoro Timer");
    print_line(&format!(
        "Work: {} | Short break: {} | Long break: {}",
        format_duration(config.work_duration),
        format_duration(config.short_break_duration),
        format_duration(config.long_break_duration),
    ));
    print_line("");
    print_line("Keyboard shortcuts:");
    print_line("  Space  - Pause/Resume");
    print_line("  q      - Quit");
    print_line("  s      - Skip");
    print_line("  r      - Reset");
    print_line("");
}

pub fn show_events(events: &[Event]) {
    for event in events {
        print_line(&describe(event));
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::SessionStarted { session_type, .. } => format!("▶ Starting {session_type}"),
        Event::SessionPaused { .. } => "⏸ Paused".to_string(),
        Event::SessionResumed { .. } => "▶ Resumed".to_string(),
        Event::SessionCompleted {
            session_type,
            completed_work,
            ..
        } => format!("✔ {session_type} completed ({completed_work} work sessions done)"),
        Event::AwaitingNext { next, .. } => format!("Next: {next}. Press s to start."),
        Event::SessionSkipped { .. } => "⏭ Skipped".to_string(),
        Event::SessionReset { .. } => "↺ Reset".to_string(),
        Event::NotifyFailed { message, .. } => message.clone(),
        Event::Quit { .. } => "Bye!".to_string(),
    }
}

/// `▶ Work [█████░░░░░] 12:34` on a single, continuously rewritten line.
pub fn render_timer(state: &PomodoroState) {
    let Some(line) = timer_line(state) else {
        return;
    };
    let mut out = io::stdout();
    let _ = queue!(out, terminal::Clear(ClearType::CurrentLine));
    let _ = write!(out, "\r{line}");
    let _ = out.flush();
}

fn timer_line(state: &PomodoroState) -> Option<String> {
    let session = state.current_session.as_ref()?;
    let secs = session.remaining.as_secs();
    let icon = match state.timer_state {
        TimerState::Paused => "⏸",
        TimerState::Completed => "✔",
        TimerState::Idle => "■",
        TimerState::Running => "▶",
    };
    Some(format!(
        "{icon} {} [{}] {:02}:{:02}",
        session.session_type,
        progress_bar(session.progress(), BAR_WIDTH),
        secs / 60,
        secs % 60
    ))
}

fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
