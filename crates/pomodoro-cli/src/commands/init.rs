use std::io::{self, BufRead, Write};
use std::time::Duration;

use pomodoro_core::storage::{format_duration, parse_duration};
use pomodoro_core::Config;

/// Walk through every setting; Enter keeps the current value.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let current = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("Note: {e} (using defaults)");
            Config::default()
        }
    };

    println!("Pomodoro Configuration Setup");
    println!("Press Enter to use current values.");
    println!();

    let stdin = io::stdin();
    let mut prompt = Prompter::new(stdin.lock(), io::stdout());
    let config = prompt.config(&current)?;
    let path = config.save()?;

    println!();
    println!("Config file saved: {}", path.display());
    Ok(())
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn config(&mut self, current: &Config) -> io::Result<Config> {
        let defaults = Config::default();
        let config = Config {
            work_duration: self.duration(
                "Work duration",
                current.work_duration,
                defaults.work_duration,
            )?,
            short_break_duration: self.duration(
                "Short break duration",
                current.short_break_duration,
                defaults.short_break_duration,
            )?,
            long_break_duration: self.duration(
                "Long break duration",
                current.long_break_duration,
                defaults.long_break_duration,
            )?,
            sessions_until_long_break: self.count(
                "Sessions until long break",
                current.sessions_until_long_break,
                defaults.sessions_until_long_break,
            )?,
            auto_start_breaks: self.yes_no(
                "Auto-start breaks",
                current.auto_start_breaks,
                defaults.auto_start_breaks,
            )?,
            auto_start_work: self.yes_no(
                "Auto-start work",
                current.auto_start_work,
                defaults.auto_start_work,
            )?,
            sound_enabled: self.yes_no("Enable sound", current.sound_enabled, defaults.sound_enabled)?,
            notify_enabled: self.yes_no(
                "Enable notifications",
                current.notify_enabled,
                defaults.notify_enabled,
            )?,
        };
        Ok(config)
    }

    fn ask(&mut self, label: &str, current: &str, example: &str) -> io::Result<String> {
        write!(self.output, "{label} [current: {current}] (e.g. {example}): ")?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn duration(&mut self, label: &str, current: Duration, example: Duration) -> io::Result<Duration> {
        let answer = self.ask(label, &format_duration(current), &format_duration(example))?;
        if answer.is_empty() {
            return Ok(current);
        }
        match parse_duration(&answer) {
            Some(d) => Ok(d),
            None => {
                writeln!(self.output, "  Invalid format, using current value")?;
                Ok(current)
            }
        }
    }

    fn count(&mut self, label: &str, current: u32, example: u32) -> io::Result<u32> {
        let answer = self.ask(label, &current.to_string(), &example.to_string())?;
        if answer.is_empty() {
            return Ok(current);
        }
        match answer.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => {
                writeln!(self.output, "  Invalid number, using current value")?;
                Ok(current)
            }
        }
    }

    fn yes_no(&mut self, label: &str, current: bool, example: bool) -> io::Result<bool> {
        let flag = |b: bool| if b { "y" } else { "n" };
        let answer = self.ask(label, flag(current), flag(example))?.to_lowercase();
        if answer.is_empty() {
            return Ok(current);
        }
        Ok(answer == "y" || answer == "yes")
    }
}
