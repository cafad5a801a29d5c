use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use crossterm::event::{self, Event as TermEvent, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pomodoro_core::storage::parse_duration;
use pomodoro_core::{Command, Config, ConfigOverrides, Event, SessionDriver, SystemNotifier, TimerEngine};

use crate::ui;

const REFRESH: Duration = Duration::from_millis(50);

#[derive(Args, Debug, Default, Clone)]
pub struct StartArgs {
    /// Work duration (e.g. 25m, 1.5m, 90s)
    #[arg(short, long, value_parser = duration_arg)]
    work: Option<Duration>,
    /// Short break duration (e.g. 5m)
    #[arg(short, long, value_parser = duration_arg)]
    short_break: Option<Duration>,
    /// Long break duration (e.g. 15m)
    #[arg(short, long, value_parser = duration_arg)]
    long_break: Option<Duration>,
    /// Sessions until long break (e.g. 4)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    sessions: Option<u32>,
    /// Disable notification sound
    #[arg(long)]
    no_sound: bool,
    /// Disable system notifications
    #[arg(long)]
    no_notify: bool,
    /// Disable auto-start of breaks
    #[arg(long)]
    no_auto_break: bool,
    /// Disable auto-start of work sessions
    #[arg(long)]
    no_auto_work: bool,
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s)
        .ok_or_else(|| format!("invalid duration '{s}' (e.g. 25m, 1h30m, 1.5m, 90s, 500ms)"))
}

impl StartArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            work_duration: self.work,
            short_break_duration: self.short_break,
            long_break_duration: self.long_break,
            sessions_until_long_break: self.sessions,
            no_sound: self.no_sound,
            no_notify: self.no_notify,
            no_auto_break: self.no_auto_break,
            no_auto_work: self.no_auto_work,
        }
    }

    /// Stored config (or defaults) with these flags layered on top.
    pub fn effective_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = Config::load_or_default();
        config.apply_overrides(&self.overrides());
        config.validate()?;
        Ok(config)
    }
}

pub fn run(args: StartArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.effective_config()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    runtime.block_on(session_loop(config))
}

async fn session_loop(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(TimerEngine::new(config.clone()));
    let mut driver = SessionDriver::new(engine, config, SystemNotifier::new());

    let mut shutdown = Shutdown::listen()?;
    let _raw = ui::RawMode::enable()?;
    ui::show_welcome(driver.config());

    let (key_tx, mut key_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || read_keys(key_tx));

    let first = driver.begin();
    ui::show_events(std::slice::from_ref(&first));

    let mut refresh = tokio::time::interval(REFRESH);
    loop {
        tokio::select! {
            key = key_rx.recv() => {
                let Some(command) = key else { break };
                let events = driver.handle(command);
                ui::show_events(&events);
                if events.iter().any(|e| matches!(e, Event::Quit { .. })) {
                    break;
                }
                ui::render_timer(&driver.engine().state());
            }
            _ = shutdown.recv() => {
                info!("termination signal received");
                ui::show_events(&driver.handle(Command::Quit));
                break;
            }
            _ = refresh.tick() => {
                // Notification helpers block for a moment.
                let events = tokio::task::block_in_place(|| driver.poll());
                ui::show_events(&events);
                ui::render_timer(&driver.engine().state());
            }
        }
    }

    info!(completed_work = driver.engine().state().completed_work, "exiting");
    Ok(())
}

/// SIGINT/SIGTERM listener. Raw mode swallows Ctrl-C as a key, but a
/// signal from elsewhere must still unwind through [`ui::RawMode`].
struct Shutdown {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Shutdown {
    fn listen() -> std::io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            )?,
        })
    }

    async fn recv(&mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = interrupted() => {}
                _ = self.terminate.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            interrupted().await;
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for interrupts");
        std::future::pending::<()>().await;
    }
}

/// Blocking reader for raw-mode key presses; exits when the loop is gone.
fn read_keys(tx: mpsc::UnboundedSender<Command>) {
    while !tx.is_closed() {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                debug!(error = %e, "key polling failed");
                return;
            }
        }
        let key = match event::read() {
            Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "key read failed");
                return;
            }
        };
        if let Some(command) = ui::command_for_key(&key) {
            if tx.send(command).is_err() {
                return;
            }
        }
    }
}
