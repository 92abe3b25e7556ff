use std::time::Duration;

/// Retry schedule for flaky remote calls (origin downloads, store probes).
/// Linear backoff; attempt numbering starts at 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(150),
        }
    }
}

pub trait BackoffPolicy {
    /// Delay to sleep before retrying after `attempt` failures; `None` once
    /// the budget is exhausted.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

impl BackoffPolicy for RetryPolicy {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        Some(self.base_delay.saturating_mul(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exhausts_after_max_attempts() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(p.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(p.next_delay(2), Some(Duration::from_millis(200)));
        assert_eq!(p.next_delay(3), None);
    }
}
