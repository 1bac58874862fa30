//! Per-round countdown.
//!
//! `RoundTimer` is the countdown itself and never touches the runtime; the
//! session loop feeds it ticks produced by a `Ticker` task.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use quiz_core::model::QuizSettings;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Expired,
    Stopped,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Expired => "expired",
            TimerState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down.
    Running { remaining_ms: u64 },
    /// This tick used up the time. Reported once per start.
    Expired,
    /// The timer was not running.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct RoundTimer {
    limit_ms: u64,
    tick_ms: u64,
    remaining_ms: u64,
    state: TimerState,
    started_at: Option<DateTime<Utc>>,
}

impl RoundTimer {
    #[must_use]
    pub fn new(limit_ms: u64, tick_ms: u64) -> Self {
        Self {
            limit_ms,
            tick_ms,
            remaining_ms: limit_ms,
            state: TimerState::Idle,
            started_at: None,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &QuizSettings) -> Self {
        Self::new(settings.time_limit_ms(), settings.tick_ms())
    }

    /// Begin a fresh countdown. A countdown already running is replaced.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.remaining_ms = self.limit_ms;
        self.state = TimerState::Running;
        self.started_at = Some(now);
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::Ignored;
        }
        if self.remaining_ms <= self.tick_ms {
            self.remaining_ms = 0;
            self.state = TimerState::Expired;
            return TickOutcome::Expired;
        }
        self.remaining_ms -= self.tick_ms;
        TickOutcome::Running {
            remaining_ms: self.remaining_ms,
        }
    }

    /// Halt a running countdown. Returns `false` when there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    #[must_use]
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    #[must_use]
    pub fn limit_ms(&self) -> u64 {
        self.limit_ms
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Remaining time as a fraction of the limit, for progress bars.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn remaining_fraction(&self) -> f64 {
        if self.limit_ms == 0 {
            return 0.0;
        }
        self.remaining_ms as f64 / self.limit_ms as f64
    }
}

//
// ─── TICKER TASK ───────────────────────────────────────────────────────────────
//

/// Periodic task that turns elapsed time into messages on a channel.
///
/// Holds only a weak sender, so a running ticker never keeps the channel open on
/// its own. The task is aborted when the handle is stopped or dropped.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Send `make_event()` every `period`, first one after a full period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<E, F>(period: Duration, tx: mpsc::WeakUnboundedSender<E>, make_event: F) -> Self
    where
        E: Send + 'static,
        F: Fn() -> E + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(tx) = tx.upgrade() else {
                    break;
                };
                if tx.send(make_event()).is_err() {
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Abort the task. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
