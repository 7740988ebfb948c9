use std::time::Duration;

/// Timing rules for the progress poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between handling one poll response and issuing the next request.
    pub interval: Duration,
    /// Delay before the first request after a video is selected.
    pub initial_delay: Duration,
    /// Slows polling down while the job reports the same progress. `None` keeps
    /// the interval fixed.
    pub stall_backoff: Option<StallBackoff>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallBackoff {
    /// Number of consecutive unchanged polls tolerated at the base interval.
    pub after_polls: u32,
    /// Multiplier applied per unchanged poll beyond `after_polls`.
    pub factor: u32,
    /// Upper bound for the backed-off delay.
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            initial_delay: Duration::ZERO,
            stall_backoff: None,
        }
    }
}

impl PollPolicy {
    /// Delay before the next poll, given how many consecutive polls reported
    /// exactly what the previous one did.
    pub fn next_delay(&self, unchanged_polls: u32) -> Duration {
        let Some(backoff) = &self.stall_backoff else {
            return self.interval;
        };
        if unchanged_polls < backoff.after_polls.max(1) {
            return self.interval;
        }
        let exponent = unchanged_polls - backoff.after_polls.max(1) + 1;
        let multiplier = backoff.factor.max(1).checked_pow(exponent).unwrap_or(u32::MAX);
        let ceiling = backoff.max_interval.max(self.interval);
        self.interval.saturating_mul(multiplier).min(ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff_policy() -> PollPolicy {
        PollPolicy {
            stall_backoff: Some(StallBackoff {
                after_polls: 3,
                factor: 2,
                max_interval: Duration::from_secs(30),
            }),
            ..PollPolicy::default()
        }
    }

    #[test]
    fn fixed_interval_without_backoff() {
        let policy = PollPolicy::default();
        assert_eq!(policy.next_delay(0), Duration::from_millis(2000));
        assert_eq!(policy.next_delay(500), Duration::from_millis(2000));
    }

    #[test]
    fn backoff_grows_after_threshold_and_caps() {
        let policy = backoff_policy();
        assert_eq!(policy.next_delay(2), Duration::from_secs(2));
        assert_eq!(policy.next_delay(3), Duration::from_secs(4));
        assert_eq!(policy.next_delay(4), Duration::from_secs(8));
        assert_eq!(policy.next_delay(6), Duration::from_secs(30));
        assert_eq!(policy.next_delay(u32::MAX), Duration::from_secs(30));
    }
}
