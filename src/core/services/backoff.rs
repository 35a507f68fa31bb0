//! Exponential backoff with jitter
//!
//! Paces retries after a failed cycle and reconnects after a lost
//! connection. Delays grow by `factor` up to `max`.

use std::time::Duration;

/// Backoff parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial: Duration,
    /// Upper bound for any delay
    pub max: Duration,
    /// Growth per consecutive failure
    pub factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(300),
            factor: 2.0,
        }
    }
}

/// Backoff state for one retrying loop
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
    failures: u32,
}

impl Backoff {
    /// Fresh backoff starting at `config.initial`
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            current: config.initial,
            config,
            failures: 0,
        }
    }

    /// Delay to wait after another failure
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.config.max);
        self.failures = self.failures.saturating_add(1);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let grown = (delay.as_millis() as f64 * self.config.factor) as u64;
        let jitter = jitter_millis(u64::try_from(delay.as_millis() / 4).unwrap_or(0));
        let max = u64::try_from(self.config.max.as_millis()).unwrap_or(u64::MAX);
        self.current = Duration::from_millis(grown.saturating_add(jitter).min(max));
        delay
    }

    /// Forget past failures
    pub const fn reset(&mut self) {
        self.current = self.config.initial;
        self.failures = 0;
    }

    /// Consecutive failures since the last reset
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}

/// Pseudo-random value in `0..max`, seeded from the clock
fn jitter_millis(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    u64::from(nanos) % max
}
