//! Integration tests for the session driver.
//!
//! A recording notifier stands in for desktop notifications.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pomodoro_core::{
    Command, Config, Event, Notifier, NotifyError, SessionDriver, SessionType, TimerEngine,
    TimerState,
};
use tokio::time::sleep;

const TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Default)]
struct RecordingNotifier {
    calls: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), NotifyError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(NotifyError::Failed {
                program: "recorder".into(),
                status: "exit status: 1".into(),
            });
        }
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn session_complete(&self, session_type: SessionType) -> Result<(), NotifyError> {
        self.record(format!("complete:{session_type}"))
    }

    fn play_sound(&self) -> Result<(), NotifyError> {
        self.record("sound".into())
    }
}

fn test_config() -> Config {
    Config {
        work_duration: TICK * 2,
        short_break_duration: TICK,
        long_break_duration: TICK * 3,
        sessions_until_long_break: 2,
        ..Config::default()
    }
}

fn driver(config: Config, notifier: RecordingNotifier) -> SessionDriver<RecordingNotifier> {
    let engine = Arc::new(TimerEngine::with_tick(config.clone(), TICK));
    SessionDriver::new(engine, config, notifier)
}

fn started(events: &[Event]) -> Option<SessionType> {
    events.iter().find_map(|e| match e {
        Event::SessionStarted { session_type, .. } => Some(*session_type),
        _ => None,
    })
}

#[tokio::test(start_paused = true)]
async fn test_full_cycle_auto_advances() {
    let notifier = RecordingNotifier::default();
    let mut driver = driver(test_config(), notifier.clone());

    assert!(matches!(
        driver.begin(),
        Event::SessionStarted { session_type: SessionType::Work, duration_secs: 2, .. }
    ));
    assert!(driver.poll().is_empty());

    sleep(TICK * 2 + TICK / 2).await;
    let events = driver.poll();
    assert!(matches!(
        events[0],
        Event::SessionCompleted { session_type: SessionType::Work, completed_work: 1, .. }
    ));
    assert_eq!(started(&events), Some(SessionType::ShortBreak));
    assert_eq!(notifier.calls(), vec!["complete:Work", "sound"]);

    // One reaction per completion.
    assert!(driver.poll().is_empty());

    sleep(TICK + TICK / 2).await;
    let events = driver.poll();
    assert_eq!(started(&events), Some(SessionType::Work));
    assert_eq!(driver.engine().state().completed_work, 1);

    sleep(TICK * 2 + TICK / 2).await;
    let events = driver.poll();
    assert_eq!(started(&events), Some(SessionType::LongBreak));
    assert_eq!(driver.engine().state().completed_work, 2);
    assert_eq!(notifier.calls().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_keypress_before_poll_keeps_completion() {
    let notifier = RecordingNotifier::default();
    let mut driver = driver(test_config(), notifier.clone());
    driver.begin();

    // The session ends between two polls and Space lands first.
    sleep(TICK * 2 + TICK / 2).await;
    assert_eq!(driver.engine().state().timer_state, TimerState::Completed);
    assert!(driver.handle(Command::TogglePause).is_empty());

    let events = driver.poll();
    assert!(matches!(
        events[0],
        Event::SessionCompleted { session_type: SessionType::Work, completed_work: 1, .. }
    ));
    assert_eq!(started(&events), Some(SessionType::ShortBreak));
    assert_eq!(notifier.calls(), vec!["complete:Work", "sound"]);
    assert_eq!(driver.engine().state().timer_state, TimerState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_waits_when_auto_start_disabled() {
    let config = Config {
        auto_start_breaks: false,
        ..test_config()
    };
    let mut driver = driver(config, RecordingNotifier::default());
    driver.begin();

    sleep(TICK * 2 + TICK / 2).await;
    let events = driver.poll();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::AwaitingNext { next: SessionType::ShortBreak, .. })));
    assert_eq!(driver.engine().state().timer_state, TimerState::Completed);

    // Space does nothing on a finished session; skip starts the pending break.
    assert!(driver.handle(Command::TogglePause).is_empty());
    let events = driver.handle(Command::Skip);
    assert_eq!(started(&events), Some(SessionType::ShortBreak));
    assert_eq!(driver.engine().state().timer_state, TimerState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_notifications_are_not_sent() {
    let config = Config {
        notify_enabled: false,
        sound_enabled: false,
        ..test_config()
    };
    let notifier = RecordingNotifier::default();
    let mut driver = driver(config, notifier.clone());
    driver.begin();

    sleep(TICK * 2 + TICK / 2).await;
    assert!(!driver.poll().is_empty());
    assert!(notifier.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_notification_failure_is_not_fatal() {
    let mut driver = driver(test_config(), RecordingNotifier::failing());
    driver.begin();

    sleep(TICK * 2 + TICK / 2).await;
    let events = driver.poll();
    let failures = events
        .iter()
        .filter(|e| matches!(e, Event::NotifyFailed { .. }))
        .count();
    assert_eq!(failures, 2);
    assert_eq!(started(&events), Some(SessionType::ShortBreak));
}

#[tokio::test(start_paused = true)]
async fn test_key_commands() {
    let mut driver = driver(test_config(), RecordingNotifier::default());
    assert!(driver.handle(Command::Reset).is_empty());
    driver.begin();

    let events = driver.handle(Command::TogglePause);
    assert!(matches!(events[0], Event::SessionPaused { remaining_ms: 2000, .. }));
    let events = driver.handle(Command::TogglePause);
    assert!(matches!(events[0], Event::SessionResumed { .. }));

    sleep(TICK + TICK / 2).await;
    let events = driver.handle(Command::Reset);
    assert!(matches!(events[0], Event::SessionReset { session_type: SessionType::Work, .. }));
    assert_eq!(driver.engine().state().remaining(), Some(TICK * 2));

    // Skipping an unfinished Work session picks the break it would have led to.
    let events = driver.handle(Command::Skip);
    assert!(matches!(
        events[0],
        Event::SessionSkipped { from: Some(SessionType::Work), to: SessionType::ShortBreak, .. }
    ));
    assert_eq!(driver.engine().state().completed_work, 0);

    let events = driver.handle(Command::Quit);
    assert!(matches!(events[0], Event::Quit { .. }));
    assert_eq!(driver.engine().state().timer_state, TimerState::Idle);
}
