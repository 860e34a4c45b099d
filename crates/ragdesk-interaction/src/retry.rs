//! Exponential backoff policy for polling loops.

use std::time::Duration;

use ragdesk_core::config::PollConfig;

/// Backoff and give-up limits for a poll session.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Wait after the first non-terminal response.
    pub initial_interval: Duration,
    /// Upper bound for any single wait.
    pub max_interval: Duration,
    /// Growth factor applied after every wait.
    pub multiplier: f64,
    /// Consecutive transient failures tolerated before giving up.
    pub max_consecutive_failures: u32,
    /// Total time budget measured from the start of the session.
    pub timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

impl BackoffPolicy {
    /// Builds the policy from configuration; the multiplier is fixed at 2.
    pub fn from_config(config: &PollConfig) -> Self {
        Self {
            initial_interval: Duration::from_millis(config.initial_interval_ms),
            max_interval: Duration::from_millis(config.max_interval_ms),
            multiplier: 2.0,
            max_consecutive_failures: config.max_consecutive_failures,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Delay before the wait with zero-based index `step`.
    pub fn calculate_delay(&self, step: u32) -> Duration {
        let initial_ms = self.initial_interval.as_millis() as f64;
        let max_ms = self.max_interval.as_millis() as f64;
        let exponent = step.min(i32::MAX as u32) as i32;
        let delay_ms = (initial_ms * self.multiplier.powi(exponent)).min(max_ms);
        Duration::from_millis(delay_ms as u64)
    }

    /// Starts a fresh schedule; intervals reset only here.
    pub fn schedule(&self) -> BackoffSchedule<'_> {
        BackoffSchedule {
            policy: self,
            step: 0,
        }
    }
}

/// Per-session cursor over [`BackoffPolicy::calculate_delay`].
#[derive(Debug)]
pub struct BackoffSchedule<'a> {
    policy: &'a BackoffPolicy,
    step: u32,
}

impl BackoffSchedule<'_> {
    /// Returns the next wait and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.calculate_delay(self.step);
        self.step = self.step.saturating_add(1);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        let mut schedule = policy.schedule();
        let waits: Vec<u128> = (0..5).map(|_| schedule.next_delay().as_millis()).collect();
        assert_eq!(waits, vec![2_000, 4_000, 5_000, 5_000, 5_000]);
        assert_eq!(policy.max_consecutive_failures, 5);
        assert_eq!(policy.timeout, Duration::from_secs(1_200));
    }

    #[test]
    fn test_schedule_restarts() {
        let policy = BackoffPolicy::default();
        let mut first = policy.schedule();
        first.next_delay();
        first.next_delay();
        assert_eq!(policy.schedule().next_delay(), Duration::from_millis(2_000));
    }

    #[test]
    fn test_large_step_stays_capped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.calculate_delay(10_000), Duration::from_millis(5_000));
    }
}
