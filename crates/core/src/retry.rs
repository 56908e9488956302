//! Bounded retry with exponential backoff.
//!
//! A run of `max_attempts` calls has `max_attempts - 1` delays between them:
//! `initial_delay`, then each delay multiplied by `multiplier`. There is no
//! delay after the last failed attempt.

use std::{future::Future, time::Duration};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            attempt: 0,
            next_delay: self.initial_delay,
        }
    }

    /// The full delay schedule, useful for logging.
    pub fn delays(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        let mut delays = Vec::new();
        while let Step::RetryAfter(delay) = backoff.on_failure() {
            delays.push(delay);
        }
        delays
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RetryAfter(Duration),
    GiveUp,
}

/// Retry state: how many attempts have failed and what the next delay is.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
    next_delay: Duration,
}

impl Backoff {
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Record a failed attempt and decide what happens next.
    pub fn on_failure(&mut self) -> Step {
        self.attempt += 1;
        if self.attempt >= self.policy.max_attempts {
            return Step::GiveUp;
        }
        let delay = self.next_delay;
        self.next_delay = self.next_delay.saturating_mul(self.policy.multiplier);
        Step::RetryAfter(delay)
    }
}

/// Call `op` until it yields `Some`, sleeping between attempts per `policy`.
/// `op` always runs at least once, even with `max_attempts` of 0.
pub async fn retry_until_some<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Option<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let mut backoff = policy.backoff();
    loop {
        if let Some(value) = op(backoff.attempts() + 1).await {
            return Some(value);
        }
        match backoff.on_failure() {
            Step::RetryAfter(delay) => {
                debug!(
                    attempt = backoff.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Step::GiveUp => return None,
        }
    }
}
