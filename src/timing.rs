//! # Timing Subsystem
//!
//! Countdowns and the event queue that feeds the session controller.
//!
//! Timers never touch score state. [`SessionTimers::tick`] only reports which
//! clocks ran out; the controller decides what that means. Every queued event
//! is stamped with the epoch of the session it was scheduled for, so events
//! that outlive their session are dropped instead of mutating a newer one.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::trace;

use crate::power_ups::PowerUpKind;
use crate::question::Answer;

/// A clock ran out during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    QuestionExpired,
    /// `hard` is false for advisory session clocks.
    SessionExpired { hard: bool },
}

/// Per-question and session-wide countdowns for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTimers {
    question_remaining: Option<u32>,
    question_allotted: u32,
    session_remaining: Option<u32>,
    session_hard: bool,
    session_expired: bool,
}

impl SessionTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the session clock; `None` means the mode has none.
    pub fn arm_session(&mut self, seconds: Option<u32>, hard: bool) {
        self.session_remaining = seconds;
        self.session_hard = hard;
        self.session_expired = false;
    }

    /// Restarts the question clock with a fresh allotment.
    pub fn arm_question(&mut self, seconds: u32) {
        self.question_remaining = Some(seconds);
        self.question_allotted = seconds;
    }

    /// Adds time to the running question clock.
    pub fn extend_question(&mut self, seconds: u32) {
        if let Some(remaining) = self.question_remaining.as_mut() {
            *remaining = remaining.saturating_add(seconds);
            self.question_allotted = self.question_allotted.saturating_add(seconds);
        }
    }

    /// Disarms both clocks. Ticks after this report nothing.
    pub fn cancel(&mut self) {
        self.question_remaining = None;
        self.session_remaining = None;
        self.session_expired = false;
    }

    pub fn is_armed(&self) -> bool {
        self.question_remaining.is_some() || self.session_remaining.is_some()
    }

    pub fn question_remaining(&self) -> u32 {
        self.question_remaining.unwrap_or(0)
    }

    /// Full allotment of the current question, bonus time included.
    pub fn question_allotted(&self) -> u32 {
        self.question_allotted
    }

    pub fn session_remaining(&self) -> Option<u32> {
        self.session_remaining
    }

    /// Advances both clocks by one second.
    ///
    /// Signals come back in a fixed order: question expiry before session
    /// expiry. An expired question clock stays disarmed until re-armed; an
    /// expired session clock signals once and then holds at zero.
    pub fn tick(&mut self) -> Vec<TimerSignal> {
        let mut signals = Vec::new();

        if let Some(remaining) = self.question_remaining {
            let next = remaining.saturating_sub(1);
            if next == 0 {
                self.question_remaining = None;
                signals.push(TimerSignal::QuestionExpired);
            } else {
                self.question_remaining = Some(next);
            }
        }

        if let Some(remaining) = self.session_remaining {
            let next = remaining.saturating_sub(1);
            self.session_remaining = Some(next);
            if next == 0 && !self.session_expired {
                self.session_expired = true;
                signals.push(TimerSignal::SessionExpired {
                    hard: self.session_hard,
                });
            }
        }

        trace!(
            "tick: question={:?} session={:?} signals={:?}",
            self.question_remaining,
            self.session_remaining,
            signals
        );
        signals
    }
}

/// Something that happens to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One second of wall time passed.
    Tick,
    /// The player answered the question at `question`.
    Answer { question: usize, answer: Answer },
    /// The player used a power-up on the question at `question`.
    PowerUp { question: usize, kind: PowerUpKind },
}

/// An event stamped with the session epoch it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub epoch: u64,
    pub event: SessionEvent,
}

/// Single-consumer FIFO of scheduled events.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<Scheduled>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, epoch: u64, event: SessionEvent) {
        self.pending.push_back(Scheduled { epoch, event });
    }

    pub fn pop(&mut self) -> Option<Scheduled> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Source of monotonic time.
pub trait Clock {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Turns elapsed clock time into whole-second ticks.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    last: Duration,
}

impl Ticker {
    pub fn start(clock: &dyn Clock) -> Self {
        Ticker { last: clock.now() }
    }

    /// Number of whole seconds since the last call; the remainder carries over.
    pub fn due(&mut self, clock: &dyn Clock) -> u32 {
        let elapsed = clock.now().saturating_sub(self.last);
        let secs = elapsed.as_secs();
        self.last += Duration::from_secs(secs);
        secs.min(u32::MAX as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_clock_expires_once() {
        let mut timers = SessionTimers::new();
        timers.arm_question(2);
        assert!(timers.tick().is_empty());
        assert_eq!(timers.tick(), vec![TimerSignal::QuestionExpired]);
        assert!(timers.tick().is_empty());
        assert!(!timers.is_armed());
    }

    #[test]
    fn extension_raises_allotment() {
        let mut timers = SessionTimers::new();
        timers.arm_question(15);
        timers.tick();
        timers.extend_question(10);
        assert_eq!(timers.question_remaining(), 24);
        assert_eq!(timers.question_allotted(), 25);
    }

    #[test]
    fn simultaneous_expiry_is_ordered() {
        let mut timers = SessionTimers::new();
        timers.arm_session(Some(3), true);
        timers.arm_question(3);
        timers.tick();
        timers.tick();
        assert_eq!(
            timers.tick(),
            vec![
                TimerSignal::QuestionExpired,
                TimerSignal::SessionExpired { hard: true }
            ]
        );
    }

    #[test]
    fn advisory_session_clock_holds_at_zero() {
        let mut timers = SessionTimers::new();
        timers.arm_session(Some(1), false);
        assert_eq!(timers.tick(), vec![TimerSignal::SessionExpired { hard: false }]);
        assert!(timers.tick().is_empty());
        assert_eq!(timers.session_remaining(), Some(0));
    }

    #[test]
    fn cancelled_timers_stay_silent() {
        let mut timers = SessionTimers::new();
        timers.arm_session(Some(1), true);
        timers.arm_question(1);
        timers.cancel();
        assert!(timers.tick().is_empty());
    }

    #[test]
    fn ticker_carries_fractions() {
        let clock = ManualClock::new();
        let mut ticker = Ticker::start(&clock);
        clock.advance(Duration::from_millis(1500));
        assert_eq!(ticker.due(&clock), 1);
        clock.advance(Duration::from_millis(600));
        assert_eq!(ticker.due(&clock), 1);
        assert_eq!(ticker.due(&clock), 0);
    }

    #[test]
    fn queue_is_fifo() {
        let mut queue = EventQueue::new();
        queue.push(1, SessionEvent::Tick);
        queue.push(
            2,
            SessionEvent::PowerUp {
                question: 0,
                kind: PowerUpKind::Hint,
            },
        );
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|s| s.epoch), Some(1));
        assert_eq!(queue.pop().map(|s| s.epoch), Some(2));
        assert!(queue.is_empty());
    }
}
