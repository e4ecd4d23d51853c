//! Polling discipline for wait-for-completion loops.
//!
//! The orchestrator in [`crate::ops`] checks remote status at a fixed
//! interval, optionally widening it with capped exponential backoff for
//! long-running jobs. The interval never drops below one second: fast
//! completions are still reported quickly, but the control plane is never
//! hammered.

use std::time::Duration;

/// Floor for the effective polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default interval between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default overall wait budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum consecutive transport errors tolerated inside one wait loop
/// before the loop gives up.
pub const MAX_CONSECUTIVE_POLL_ERRORS: u32 = 5;

/// Options for one `wait` call.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Overall wall-clock budget for this wait call.
    pub timeout: Duration,
    /// Base interval between status checks (clamped to ≥ 1s).
    pub poll_interval: Duration,
    /// When set, the interval doubles per check up to this cap.
    pub backoff_cap: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff_cap: None,
        }
    }
}

impl WaitOptions {
    /// Create options with an explicit timeout and interval.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            backoff_cap: None,
        }
    }

    /// Convenience constructor from whole seconds.
    pub fn from_secs(timeout_secs: u64, poll_interval_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(poll_interval_secs),
        )
    }

    /// Enable exponential backoff, capped at `cap`.
    pub fn with_backoff_cap(mut self, cap: Duration) -> Self {
        self.backoff_cap = Some(cap);
        self
    }

    /// The base interval with the 1-second floor applied.
    pub fn effective_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    /// Delay to sleep after the `checks`-th status check (1-based).
    ///
    /// The delay is clamped to `remaining` so a wait never overshoots its
    /// deadline by more than one interval.
    pub fn next_delay(&self, checks: u32, remaining: Duration) -> Duration {
        let base = self.effective_interval();
        let delay = match self.backoff_cap {
            None => base,
            Some(cap) => {
                // checks is 1 after the first probe; exponent saturates
                // long before the cap does the real work.
                let exponent = checks.saturating_sub(1).min(16);
                let multiplied = base.saturating_mul(2u32.saturating_pow(exponent));
                multiplied.min(cap.max(base))
            }
        };
        delay.min(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_floor() {
        let opts = WaitOptions::new(Duration::from_secs(60), Duration::from_millis(50));
        assert_eq!(opts.effective_interval(), MIN_POLL_INTERVAL);

        let opts = WaitOptions::from_secs(60, 5);
        assert_eq!(opts.effective_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_fixed_interval_without_backoff() {
        let opts = WaitOptions::from_secs(600, 2);
        let far = Duration::from_secs(500);
        assert_eq!(opts.next_delay(1, far), Duration::from_secs(2));
        assert_eq!(opts.next_delay(10, far), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let opts = WaitOptions::from_secs(3600, 2).with_backoff_cap(Duration::from_secs(30));
        let far = Duration::from_secs(3000);
        assert_eq!(opts.next_delay(1, far), Duration::from_secs(2));
        assert_eq!(opts.next_delay(2, far), Duration::from_secs(4));
        assert_eq!(opts.next_delay(3, far), Duration::from_secs(8));
        assert_eq!(opts.next_delay(4, far), Duration::from_secs(16));
        // capped
        assert_eq!(opts.next_delay(5, far), Duration::from_secs(30));
        assert_eq!(opts.next_delay(12, far), Duration::from_secs(30));
    }

    #[test]
    fn test_delay_clamped_to_remaining_budget() {
        let opts = WaitOptions::from_secs(600, 10);
        assert_eq!(
            opts.next_delay(1, Duration::from_secs(3)),
            Duration::from_secs(3)
        );
        assert_eq!(opts.next_delay(1, Duration::ZERO), Duration::ZERO);
    }
}
