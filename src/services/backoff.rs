//! Reconnect backoff policy.
//!
//! The delay before automatic attempt `n` (1-based) is
//! `min(base * 2^(n-1), max)`. With the defaults that is 2s, 4s, 8s, 16s,
//! 30s, after which automatic retries stop.

use std::time::Duration;

use crate::models::ReconnectConfig;

/// Outcome of asking the policy about the next automatic attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffDecision {
    /// Schedule `attempt` after `delay`
    Retry { attempt: u32, delay: Duration },
    /// Ceiling reached; only a manual reconnect may try again
    Exhausted { attempts: u32 },
}

/// Exponential backoff with a ceiling on delay and on attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    config: ReconnectConfig,
}

impl BackoffPolicy {
    /// Create a policy with the default 2s/30s/5-attempt settings.
    pub fn new() -> Self {
        Self::with_config(ReconnectConfig::default())
    }

    /// Create a policy with custom settings.
    pub fn with_config(config: ReconnectConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Delay before automatic attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let millis = self
            .config
            .base_delay_ms
            .checked_mul(1u64 << exponent)
            .unwrap_or(u64::MAX)
            .min(self.config.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Decide what follows a failure when `attempts_made` automatic
    /// attempts have already been scheduled.
    pub fn next(&self, attempts_made: u32) -> BackoffDecision {
        if attempts_made >= self.config.max_attempts {
            return BackoffDecision::Exhausted {
                attempts: attempts_made,
            };
        }
        let attempt = attempts_made + 1;
        BackoffDecision::Retry {
            attempt,
            delay: self.delay_for(attempt),
        }
    }

    /// Every delay the policy would schedule, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.config.max_attempts)
            .map(|attempt| self.delay_for(attempt))
            .collect()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new()
    }
}
