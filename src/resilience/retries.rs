//! Cold-start retry policy.
//!
//! # Responsibilities
//! - Carry per-call retry state (attempt counter, "already refreshed" flag)
//! - Decide whether a transient failure gets another attempt
//! - Compute the linear delay before that attempt
//!
//! # Design Decisions
//! - Retry state is a value owned by the call, so concurrent calls retry independently
//! - The waking notification belongs to the first retry only
//! - Exhausting the attempts is terminal

use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::linear_backoff;

/// Per-call state threaded through every attempt of one gateway call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// This call already triggered a credential refresh.
    pub retried: bool,
    /// Cold-start retries performed so far.
    pub attempt: u32,
}

/// Linear-backoff retry policy for a service that may still be starting.
#[derive(Debug, Clone)]
pub struct ColdStartPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
    transient_statuses: Vec<u16>,
}

impl ColdStartPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration, transient_statuses: Vec<u16>) -> Self {
        Self {
            max_attempts,
            backoff_unit,
            transient_statuses,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let max_attempts = if config.enabled { config.max_attempts } else { 0 };
        Self::new(
            max_attempts,
            config.backoff_unit(),
            config.transient_statuses.clone(),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn transient_statuses(&self) -> &[u16] {
        &self.transient_statuses
    }

    /// Claim the next attempt for `ctx`, returning how long to wait first.
    ///
    /// Returns `None` once the call has used all its attempts.
    pub fn next_delay(&self, ctx: &mut RetryContext) -> Option<Duration> {
        if ctx.attempt >= self.max_attempts {
            return None;
        }
        ctx.attempt += 1;
        Some(linear_backoff(ctx.attempt, self.backoff_unit))
    }

    /// Whether the attempt just claimed should announce that the service is waking.
    pub fn should_notify(ctx: &RetryContext) -> bool {
        ctx.attempt == 1
    }
}

impl Default for ColdStartPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_linear_attempts_then_exhausted() {
        let policy = ColdStartPolicy::default();
        let mut ctx = RetryContext::default();

        let delays: Vec<_> = std::iter::from_fn(|| policy.next_delay(&mut ctx)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(8),
                Duration::from_secs(16),
                Duration::from_secs(24)
            ]
        );
        assert_eq!(ctx.attempt, 3);
        assert!(policy.next_delay(&mut ctx).is_none());
        assert_eq!(ctx.attempt, 3);
    }

    #[test]
    fn test_notify_only_on_first_attempt() {
        let policy = ColdStartPolicy::default();
        let mut ctx = RetryContext::default();
        let mut notified = 0;
        while policy.next_delay(&mut ctx).is_some() {
            if ColdStartPolicy::should_notify(&ctx) {
                notified += 1;
            }
        }
        assert_eq!(notified, 1);
    }

    #[test]
    fn test_contexts_are_independent() {
        let policy = ColdStartPolicy::default();
        let mut a = RetryContext::default();
        let mut b = RetryContext { retried: true, attempt: 0 };

        policy.next_delay(&mut a);
        policy.next_delay(&mut a);
        assert_eq!(policy.next_delay(&mut b), Some(Duration::from_secs(8)));
        assert!(b.retried, "refresh flag survives retries");
        assert_eq!(a.attempt, 2);
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let config = RetryConfig {
            enabled: false,
            ..RetryConfig::default()
        };
        let policy = ColdStartPolicy::from_config(&config);
        assert!(policy.next_delay(&mut RetryContext::default()).is_none());
    }
}
