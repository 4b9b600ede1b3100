//! Abort storm detection

use std::time::{Duration, Instant};

use tracing::debug;

/// Outcome of recording an unexpected abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortVerdict {
    /// Restart normally
    Retry,
    /// Too many rapid aborts; no restart before `until`
    BackOff { until: Instant },
}

/// Counts consecutive unexpected aborts within a rolling window
#[derive(Debug, Clone)]
pub struct RetryBudget {
    max_retries: u32,
    window: Duration,
    cooldown: Duration,
    count: u32,
    last_abort: Option<Instant>,
    backoff_until: Option<Instant>,
}

impl RetryBudget {
    pub fn new(max_retries: u32, window: Duration, cooldown: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            window,
            cooldown,
            count: 0,
            last_abort: None,
            backoff_until: None,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn record_abort(&mut self, now: Instant) -> AbortVerdict {
        let rapid = self
            .last_abort
            .map(|last| now.saturating_duration_since(last) < self.window)
            .unwrap_or(false);

        self.count = if rapid { self.count + 1 } else { 1 };
        self.last_abort = Some(now);
        debug!(count = self.count, rapid, "recognition aborted unexpectedly");

        if self.count >= self.max_retries {
            let until = now + self.cooldown;
            self.backoff_until = Some(until);
            AbortVerdict::BackOff { until }
        } else {
            AbortVerdict::Retry
        }
    }

    pub fn in_backoff(&self, now: Instant) -> bool {
        self.backoff_until.map(|until| now < until).unwrap_or(false)
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.last_abort = None;
        self.backoff_until = None;
    }
}
