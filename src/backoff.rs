//! Poll scheduling with backoff after failures
//!
//! A healthy poller ticks at the base interval. Each consecutive failure
//! doubles the wait up to the cap, so an unreachable service is not hammered
//! every few seconds; the first success drops straight back to the base.
//! With a 3s interval and 30s cap the failure sequence is
//! 3s, 6s, 12s, 24s, 30s, 30s...

use std::time::Duration;

/// Delay calculator for a polling loop
#[derive(Debug, Clone)]
pub struct PollBackoff {
    /// Consecutive failures since the last success
    failures: u32,
    interval: Duration,
    max: Duration,
}

impl PollBackoff {
    pub fn new(interval: Duration, max: Duration) -> Self {
        Self {
            failures: 0,
            interval,
            max: max.max(interval),
        }
    }

    /// Record a successful poll and return the delay before the next one
    pub fn succeeded(&mut self) -> Duration {
        self.failures = 0;
        self.interval
    }

    /// Record a failed poll and return the delay before the next one
    pub fn failed(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        self.current_delay()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay implied by the current failure count
    pub fn current_delay(&self) -> Duration {
        // interval * 2^(failures - 1), saturating, capped at max
        let exponent = self.failures.saturating_sub(1);
        let multiplier = 2u64.saturating_pow(exponent);
        let computed = (self.interval.as_millis() as u64).saturating_mul(multiplier);
        Duration::from_millis(computed.min(self.max.as_millis() as u64))
    }
}
