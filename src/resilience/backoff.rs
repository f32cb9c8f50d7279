//! Linear backoff.

use std::time::Duration;

/// Delay before retry `attempt` (1-based): `attempt × unit`.
pub fn linear_backoff(attempt: u32, unit: Duration) -> Duration {
    unit.saturating_mul(attempt)
}
