//! Exponential backoff for broker (re)connection

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub base_ms: u64,
    pub multiplier: f64,
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 1000,
            multiplier: 2.0,
            max_ms: 10_000,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (0-based), capped at `max_ms`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(63) as i32);
        let ms = (self.base_ms as f64 * factor).min(self.max_ms as f64);
        Duration::from_millis(ms as u64)
    }
}
