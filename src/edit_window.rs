//! The correction window that opens after attendance is submitted.
//!
//! State is only `submitted_at` plus a fixed duration. Everything else is derived from
//! the wall clock on demand, so a suspended process cannot drift from the true deadline.

use serde::Serialize;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditWindow {
    duration: Duration,
    submitted_at: Option<OffsetDateTime>,
}

/// Derived state of an [`EditWindow`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditWindowPhase {
    /// Nothing submitted for this session view yet.
    Idle,
    Editable {
        remaining: Duration,
        deadline: OffsetDateTime,
    },
    Locked {
        locked_at: OffsetDateTime,
    },
}

/// What the UI shows for the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum EditWindowDisplay {
    Idle,
    Editable { remaining_seconds: u64 },
    Locked,
}

impl EditWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            submitted_at: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn submitted_at(&self) -> Option<OffsetDateTime> {
        self.submitted_at
    }

    pub fn phase(&self, now: OffsetDateTime) -> EditWindowPhase {
        let Some(submitted_at) = self.submitted_at else {
            return EditWindowPhase::Idle;
        };
        // A window too long to represent never closes.
        let deadline = submitted_at.saturating_add(self.duration);
        if now >= deadline {
            return EditWindowPhase::Locked {
                locked_at: deadline,
            };
        }
        // A clock that stepped backwards never grants more than one full window.
        let remaining = (deadline - now).min(self.duration);
        EditWindowPhase::Editable {
            remaining,
            deadline,
        }
    }

    pub fn is_locked(&self, now: OffsetDateTime) -> bool {
        matches!(self.phase(now), EditWindowPhase::Locked { .. })
    }

    pub fn display(&self, now: OffsetDateTime) -> EditWindowDisplay {
        match self.phase(now) {
            EditWindowPhase::Idle => EditWindowDisplay::Idle,
            EditWindowPhase::Locked { .. } => EditWindowDisplay::Locked,
            EditWindowPhase::Editable { remaining, .. } => EditWindowDisplay::Editable {
                remaining_seconds: ceil_seconds(remaining),
            },
        }
    }

    /// Opens a fresh window at `now`, discarding any earlier submission time.
    pub fn restart(&mut self, now: OffsetDateTime) {
        self.submitted_at = Some(now);
    }

    /// Opens the window only if nothing has been submitted yet.
    pub fn start_if_idle(&mut self, now: OffsetDateTime) {
        if self.submitted_at.is_none() {
            self.submitted_at = Some(now);
        }
    }

    pub fn reset(&mut self) {
        self.submitted_at = None;
    }
}

fn ceil_seconds(d: Duration) -> u64 {
    let whole = d.whole_seconds();
    let partial = d.subsec_nanoseconds() > 0;
    (whole + i64::from(partial)).max(0) as u64
}
