//! # Flush Scheduler
//!
//! Debounce state machine for flushes.
//!
//! ```text
//!            records                deadline / sync_now
//!   Idle ─────────────▶ Pending ───────────────────────▶ Flushing
//!    ▲                   │  ▲ records restart the timer      │
//!    │                   └──┘                                │
//!    └──────────────────────── end_flush ◀───────────────────┘
//! ```
//!
//! A request that lands while `Flushing` is deferred and comes due as soon
//! as the running flush ends. Nothing is ever dropped.

use tokio::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    Pending { deadline: Instant },
    Flushing,
}

#[derive(Debug)]
pub struct Scheduler {
    state: FlushState,
    debounce: Duration,
    deferred: bool,
}

impl Scheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: FlushState::Idle,
            debounce,
            deferred: false,
        }
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// New records arrived: (re)start the debounce timer
    pub fn on_records(&mut self, now: Instant) {
        match self.state {
            FlushState::Idle | FlushState::Pending { .. } => {
                let deadline = now + self.debounce;
                trace!(?deadline, "debounce restarted");
                self.state = FlushState::Pending { deadline };
            }
            FlushState::Flushing => self.deferred = true,
        }
    }

    /// Immediate sync request. Returns `false` when it had to be deferred.
    pub fn request_sync(&mut self, now: Instant) -> bool {
        match self.state {
            FlushState::Flushing => {
                self.deferred = true;
                false
            }
            _ => {
                self.state = FlushState::Pending { deadline: now };
                true
            }
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            FlushState::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.state, FlushState::Pending { deadline } if deadline <= now)
    }

    /// Enters `Flushing`; `false` if a flush is already running
    pub fn begin_flush(&mut self) -> bool {
        if self.state == FlushState::Flushing {
            self.deferred = true;
            return false;
        }
        self.state = FlushState::Flushing;
        true
    }

    /// Leaves `Flushing`. A deferred request comes due at `now`.
    pub fn end_flush(&mut self, now: Instant) {
        self.state = if std::mem::take(&mut self.deferred) {
            FlushState::Pending { deadline: now }
        } else {
            FlushState::Idle
        };
    }

    /// Drops any pending timer (unmount)
    pub fn cancel(&mut self) {
        self.state = FlushState::Idle;
        self.deferred = false;
    }
}
