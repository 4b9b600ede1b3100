//! One pending deadline per purpose
//!
//! Scheduling a timer replaces whatever was pending for the same purpose, so
//! two restarts can never stack.

use std::time::Instant;

/// Why a timer was scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Re-arm recognition after a termination or after speech
    Restart,
    /// End of the abort back-off
    Cooldown,
    /// Command-mode inactivity
    Inactivity,
    /// Reset the status line after a reply
    Status,
    /// Startup greeting
    Greeting,
}

impl TimerKind {
    const ALL: [TimerKind; 5] = [
        TimerKind::Restart,
        TimerKind::Cooldown,
        TimerKind::Inactivity,
        TimerKind::Status,
        TimerKind::Greeting,
    ];

    fn slot(self) -> usize {
        match self {
            TimerKind::Restart => 0,
            TimerKind::Cooldown => 1,
            TimerKind::Inactivity => 2,
            TimerKind::Status => 3,
            TimerKind::Greeting => 4,
        }
    }
}

#[derive(Debug, Default)]
pub struct Timers {
    deadlines: [Option<Instant>; 5],
}

impl Timers {
    /// Set the deadline for `kind`, replacing any pending one
    pub fn schedule(&mut self, kind: TimerKind, at: Instant) {
        self.deadlines[kind.slot()] = Some(at);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.deadlines[kind.slot()] = None;
    }

    /// Cancel every timer but `keep`
    pub fn cancel_all_except(&mut self, keep: TimerKind) {
        for kind in TimerKind::ALL {
            if kind != keep {
                self.cancel(kind);
            }
        }
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.deadlines[kind.slot()]
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.deadline(kind).is_some()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Remove and return the earliest timer due at `now`
    pub fn take_due(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .iter()
            .copied()
            .filter_map(|kind| self.deadline(kind).map(|at| (at, kind)))
            .filter(|(at, _)| *at <= now)
            .min_by_key(|(at, _)| *at)
            .map(|(_, kind)| kind)?;
        self.cancel(kind);
        Some(kind)
    }
}
