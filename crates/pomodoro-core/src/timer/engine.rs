//! Timer engine implementation.
//!
//! The engine owns a single [`PomodoroState`] and one background countdown
//! task at a time. Every mutation (commands, tick decrement, completion)
//! happens under one `RwLock`; [`TimerEngine::state`] takes the read side and
//! hands out a copy.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running -> (Idle | Completed)
//! Completed -> Running (start) | Idle (stop)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let engine = TimerEngine::new(Durations::default());
//! engine.start(SessionType::Work);
//! // In a UI loop:
//! let snapshot = engine.state();
//! ```

use std::ops::ControlFlow;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::session::{PomodoroState, Session, SessionType, TimerState};

/// Default countdown quantum.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Resolves the configured length of each session type.
pub trait DurationLookup: Send + Sync + 'static {
    fn duration_for(&self, session_type: SessionType) -> Duration;
}

/// Plain duration-per-session-type record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub work: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work: Duration::from_secs(25 * 60),
            short_break: Duration::from_secs(5 * 60),
            long_break: Duration::from_secs(15 * 60),
        }
    }
}

impl DurationLookup for Durations {
    fn duration_for(&self, session_type: SessionType) -> Duration {
        match session_type {
            SessionType::Work => self.work,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        }
    }
}

struct Inner {
    state: PomodoroState,
    /// Token of the countdown task currently allowed to decrement.
    countdown: Option<CancellationToken>,
}

struct Shared {
    inner: RwLock<Inner>,
    tick: Duration,
    updates: watch::Sender<PomodoroState>,
}

impl Shared {
    // A panic inside a critical section never leaves the aggregate half
    // written, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &PomodoroState) {
        self.updates.send_replace(state.clone());
    }

    /// Apply one tick. `Break` tells the countdown task to exit.
    fn tick_once(&self, token: &CancellationToken) -> ControlFlow<()> {
        let mut inner = self.write();

        // Start/Stop cancel under this same lock, so a replaced task can
        // never get a decrement in after the call that replaced it.
        if token.is_cancelled() {
            return ControlFlow::Break(());
        }
        if inner.state.timer_state != TimerState::Running {
            return ControlFlow::Continue(());
        }
        let Some(session) = inner.state.current_session.as_mut() else {
            return ControlFlow::Continue(());
        };

        session.remaining = session.remaining.saturating_sub(self.tick);
        debug_assert!(session.remaining <= session.duration);
        if !session.remaining.is_zero() {
            trace!(remaining_ms = session.remaining.as_millis() as u64, "tick");
            self.publish(&inner.state);
            return ControlFlow::Continue(());
        }

        let session_type = session.session_type;
        if session_type == SessionType::Work {
            inner.state.completed_work += 1;
        }
        inner.state.timer_state = TimerState::Completed;
        inner.countdown = None;
        info!(
            %session_type,
            completed_work = inner.state.completed_work,
            "session completed"
        );
        self.publish(&inner.state);
        ControlFlow::Break(())
    }
}

/// Concurrent countdown engine.
///
/// Commands never fail: inapplicable ones are silent no-ops. The countdown
/// runs on a Tokio task; at most one is alive at any time.
pub struct TimerEngine {
    shared: Arc<Shared>,
    durations: Box<dyn DurationLookup>,
    runtime: Handle,
}

impl TimerEngine {
    /// Create an idle engine ticking once per second.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime. Use
    /// [`TimerEngine::with_runtime`] to pass a handle explicitly.
    pub fn new(durations: impl DurationLookup) -> Self {
        Self::with_tick(durations, DEFAULT_TICK)
    }

    /// Create an idle engine with a custom tick quantum.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, or if `tick` is zero.
    pub fn with_tick(durations: impl DurationLookup, tick: Duration) -> Self {
        Self::with_runtime(durations, tick, Handle::current())
    }

    /// Create an idle engine whose countdowns run on `runtime`.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is zero.
    pub fn with_runtime(durations: impl DurationLookup, tick: Duration, runtime: Handle) -> Self {
        assert!(!tick.is_zero(), "timer tick must be non-zero");
        let state = PomodoroState::default();
        let (updates, _) = watch::channel(state.clone());
        Self {
            shared: Arc::new(Shared {
                inner: RwLock::new(Inner {
                    state,
                    countdown: None,
                }),
                tick,
                updates,
            }),
            durations: Box::new(durations),
            runtime,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Independent copy of the aggregate state.
    pub fn state(&self) -> PomodoroState {
        self.shared.read().state.clone()
    }

    /// Receive a fresh snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<PomodoroState> {
        self.shared.updates.subscribe()
    }

    pub fn tick(&self) -> Duration {
        self.shared.tick
    }

    pub fn duration_for(&self, session_type: SessionType) -> Duration {
        self.durations.duration_for(session_type)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new session, replacing whatever was running.
    pub fn start(&self, session_type: SessionType) {
        let duration = self.durations.duration_for(session_type);
        let token = CancellationToken::new();
        let first_tick = Instant::now() + self.shared.tick;
        {
            let mut inner = self.shared.write();
            if let Some(previous) = inner.countdown.replace(token.clone()) {
                previous.cancel();
            }
            inner.state.current_session = Some(Session::new(session_type, duration));
            inner.state.timer_state = TimerState::Running;
            self.shared.publish(&inner.state);
        }
        debug!(%session_type, duration_secs = duration.as_secs(), "session started");

        self.runtime
            .spawn(countdown(Arc::clone(&self.shared), token, first_tick));
    }

    pub fn pause(&self) {
        let mut inner = self.shared.write();
        if inner.state.timer_state != TimerState::Running {
            return;
        }
        inner.state.timer_state = TimerState::Paused;
        if let Some(session) = inner.state.current_session.as_mut() {
            session.paused_at = Some(Utc::now());
        }
        debug!("session paused");
        self.shared.publish(&inner.state);
    }

    pub fn resume(&self) {
        let mut inner = self.shared.write();
        if inner.state.timer_state != TimerState::Paused {
            return;
        }
        inner.state.timer_state = TimerState::Running;
        debug!("session resumed");
        self.shared.publish(&inner.state);
    }

    /// Cancel the countdown and go Idle. The last session is kept for display.
    pub fn stop(&self) {
        let mut inner = self.shared.write();
        if let Some(token) = inner.countdown.take() {
            token.cancel();
        }
        if inner.state.timer_state != TimerState::Idle {
            debug!("session stopped");
        }
        inner.state.timer_state = TimerState::Idle;
        self.shared.publish(&inner.state);
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        if let Some(token) = self.shared.write().countdown.take() {
            token.cancel();
        }
    }
}

async fn countdown(shared: Arc<Shared>, token: CancellationToken, first_tick: Instant) {
    let mut ticker = interval_at(first_tick, shared.tick);
    // Late ticks push the schedule back; drift is not corrected.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = token.cancelled() => {
                trace!("countdown cancelled");
                return;
            }
            _ = ticker.tick() => {
                if shared.tick_once(&token).is_break() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const TICK: Duration = Duration::from_secs(1);

    fn durations(work: u64, short_break: u64, long_break: u64) -> Durations {
        Durations {
            work: TICK * work as u32,
            short_break: TICK * short_break as u32,
            long_break: TICK * long_break as u32,
        }
    }

    #[tokio::test]
    #[should_panic(expected = "timer tick must be non-zero")]
    async fn zero_tick_is_rejected() {
        let _ = TimerEngine::with_tick(durations(2, 1, 3), Duration::ZERO);
    }

    /// Sleep `ticks` quanta plus half a quantum so no deadline ties with a tick.
    async fn advance(ticks: u32) {
        sleep(TICK * ticks + TICK / 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn new_engine_is_idle() {
        let engine = TimerEngine::new(Durations::default());
        let state = engine.state();
        assert_eq!(state.timer_state, TimerState::Idle);
        assert_eq!(state.completed_work, 0);
        assert!(state.current_session.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_sets_running_with_full_duration() {
        let engine = TimerEngine::new(durations(3600, 300, 900));
        engine.start(SessionType::Work);

        let state = engine.state();
        assert_eq!(state.timer_state, TimerState::Running);
        let session = state.current_session.unwrap();
        assert_eq!(session.session_type, SessionType::Work);
        assert_eq!(session.remaining, session.duration);
        assert_eq!(session.duration, Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn duration_lookup_per_type() {
        let engine = TimerEngine::new(durations(25, 5, 15));
        assert_eq!(engine.duration_for(SessionType::Work), TICK * 25);
        assert_eq!(engine.duration_for(SessionType::ShortBreak), TICK * 5);
        assert_eq!(engine.duration_for(SessionType::LongBreak), TICK * 15);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume() {
        let engine = TimerEngine::new(durations(60, 5, 15));
        engine.start(SessionType::Work);

        engine.pause();
        let paused = engine.state();
        assert_eq!(paused.timer_state, TimerState::Paused);
        assert!(paused.current_session.unwrap().paused_at.is_some());

        engine.resume();
        assert_eq!(engine.state().timer_state, TimerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_are_noops_when_inapplicable() {
        let engine = TimerEngine::new(durations(60, 5, 15));
        engine.pause();
        engine.resume();
        assert_eq!(engine.state().timer_state, TimerState::Idle);

        engine.start(SessionType::Work);
        engine.resume();
        assert_eq!(engine.state().timer_state, TimerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_decreases_one_quantum_per_tick() {
        let engine = TimerEngine::new(durations(5, 5, 15));
        engine.start(SessionType::Work);
        advance(2).await;
        assert_eq!(engine.state().remaining(), Some(TICK * 3));
        engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn work_completion_increments_counter() {
        let engine = TimerEngine::new(durations(2, 5, 15));
        engine.start(SessionType::Work);
        advance(2).await;

        let state = engine.state();
        assert_eq!(state.timer_state, TimerState::Completed);
        assert_eq!(state.completed_work, 1);
        assert_eq!(state.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn break_completion_leaves_counter() {
        let engine = TimerEngine::new(durations(5, 1, 1));
        engine.start(SessionType::ShortBreak);
        advance(1).await;
        let state = engine.state();
        assert_eq!(state.timer_state, TimerState::Completed);
        assert_eq!(state.completed_work, 0);

        engine.start(SessionType::LongBreak);
        advance(1).await;
        let state = engine.state();
        assert_eq!(state.timer_state, TimerState::Completed);
        assert_eq!(state.completed_work, 0);
        assert_eq!(state.current_session.unwrap().session_type, SessionType::LongBreak);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_remaining_then_resume_completes() {
        let engine = TimerEngine::new(durations(5, 5, 15));
        engine.start(SessionType::Work);
        advance(1).await;
        engine.pause();
        let at_pause = engine.state().remaining();
        assert_eq!(at_pause, Some(TICK * 4));

        sleep(TICK * 2).await;
        assert_eq!(engine.state().remaining(), at_pause);
        assert_eq!(engine.state().timer_state, TimerState::Paused);

        engine.resume();
        assert_eq!(engine.state().remaining(), at_pause);
        sleep(TICK * 4).await;
        let state = engine.state();
        assert_eq!(state.timer_state, TimerState::Completed);
        assert_eq!(state.completed_work, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_countdown() {
        let engine = TimerEngine::new(durations(10, 5, 15));
        engine.start(SessionType::Work);
        sleep(TICK / 2).await;
        engine.start(SessionType::Work);
        engine.start(SessionType::Work);

        // Only the newest countdown may decrement.
        advance(1).await;
        assert_eq!(engine.state().remaining(), Some(TICK * 9));
        sleep(TICK * 2).await;
        assert_eq!(engine.state().remaining(), Some(TICK * 7));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_from_any_state_is_idle_and_stable() {
        let engine = TimerEngine::new(durations(5, 5, 15));
        engine.stop();
        assert_eq!(engine.state().timer_state, TimerState::Idle);

        engine.start(SessionType::Work);
        advance(1).await;
        engine.stop();
        let stopped = engine.state();
        assert_eq!(stopped.timer_state, TimerState::Idle);
        assert_eq!(stopped.remaining(), Some(TICK * 4));

        advance(3).await;
        engine.stop();
        assert_eq!(engine.state(), stopped);

        engine.start(SessionType::Work);
        engine.pause();
        engine.stop();
        assert_eq!(engine.state().timer_state, TimerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_then_start_runs_again() {
        let engine = TimerEngine::new(durations(1, 2, 15));
        engine.start(SessionType::Work);
        advance(1).await;
        assert_eq!(engine.state().timer_state, TimerState::Completed);

        engine.start(SessionType::ShortBreak);
        let state = engine.state();
        assert_eq!(state.timer_state, TimerState::Running);
        assert_eq!(state.remaining(), Some(TICK * 2));
        assert_eq!(state.completed_work, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_is_independent_copy() {
        let engine = TimerEngine::new(durations(5, 5, 15));
        engine.start(SessionType::Work);
        let before = engine.state();
        advance(1).await;
        assert_eq!(before.remaining(), Some(TICK * 5));
        assert_eq!(engine.state().remaining(), Some(TICK * 4));
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_completion() {
        let engine = TimerEngine::new(durations(2, 5, 15));
        let mut updates = engine.subscribe();
        engine.start(SessionType::Work);

        let completed = updates
            .wait_for(|s| s.timer_state == TimerState::Completed)
            .await
            .unwrap()
            .clone();
        assert_eq!(completed.completed_work, 1);
    }
}
