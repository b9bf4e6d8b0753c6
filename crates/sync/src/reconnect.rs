//! Bounded reconnection policy for the push channel.
//!
//! The channel makes one initial connection attempt and then at most
//! [`ReconnectConfig::max_attempts`] automatic retries. Any successful
//! open resets the counter. Once the budget is spent the channel stops
//! and waits for a manual reconnect.

use std::time::Duration;

/// Default number of automatic retries after a close.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(3000);

/// How the delay grows between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Every attempt waits [`ReconnectConfig::delay`].
    Fixed,
    /// The delay is multiplied by `multiplier` after each failure, up to
    /// `max_delay`.
    Exponential { multiplier: f64, max_delay: Duration },
}

/// Tunable parameters for the reconnect policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
            backoff: Backoff::Fixed,
        }
    }
}

/// Calculate the delay that follows `current` under `config`.
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    match config.backoff {
        Backoff::Fixed => config.delay,
        Backoff::Exponential {
            multiplier,
            max_delay,
        } => {
            let next_ms = (current.as_millis() as f64 * multiplier) as u64;
            Duration::from_millis(next_ms).min(max_delay)
        }
    }
}

/// Delay to wait before retry number `attempt` (1-based).
pub fn delay_for_attempt(attempt: u32, config: &ReconnectConfig) -> Duration {
    let mut delay = config.delay;
    for _ in 1..attempt {
        delay = next_delay(delay, config);
    }
    delay
}

/// Attempt counter for one connection task.
#[derive(Debug, Default)]
pub struct ReconnectState {
    attempts: u32,
}

impl ReconnectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries scheduled since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// A connection opened; the retry budget is restored.
    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// A connection closed or failed to open.
    ///
    /// Returns the delay before the next retry, or `None` when the budget
    /// is exhausted.
    pub fn on_closed(&mut self, config: &ReconnectConfig) -> Option<Duration> {
        if self.is_exhausted(config) {
            return None;
        }
        self.attempts += 1;
        Some(delay_for_attempt(self.attempts, config))
    }

    pub fn is_exhausted(&self, config: &ReconnectConfig) -> bool {
        self.attempts >= config.max_attempts
    }
}
