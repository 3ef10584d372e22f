// Bounded retry for remote calls
use crate::domain::error::MistwarError;
use crate::infrastructure::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, config.delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy runs out.
///
/// Only transient errors are retried; anything else is returned as is.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, MistwarError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MistwarError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt < attempts => {
                warn!(
                    "{} failed: {}. Retrying in {}ms ({}/{}).",
                    what,
                    e,
                    policy.delay.as_millis(),
                    attempt,
                    attempts
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(MistwarError::RetriesExhausted {
                    attempts,
                    last: e.to_string(),
                })
            }
        }
    }
}

/// Single attempt; a failure is logged and becomes `None`.
pub async fn try_once<T, Fut>(what: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, MistwarError>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{} failed: {}", what, e);
            None
        }
    }
}
