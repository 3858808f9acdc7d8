//! Bounded retry for counter-mutating transactions
//!
//! Only storage serialization conflicts and deadlocks are retried. The retry
//! is invisible to the caller; once the attempts run out the caller gets
//! `Conflict(contention)`. Business errors pass straight through.

use std::future::Future;
use std::time::Duration;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};
use crate::config::RegistrationConfig;
use crate::utils::errors::{CampusError, ConflictReason, Result};

const MAX_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RegistrationConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RegistrationConfig) -> Self {
        Self {
            max_retries: config.max_transaction_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Exponential backoff with up to one base delay of jitter, capped
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let backoff = base_ms.saturating_mul(1u64 << attempt.min(16));
        let jitter = if base_ms > 0 { rand::thread_rng().gen_range(0..base_ms) } else { 0 };
        Duration::from_millis(backoff.saturating_add(jitter)).min(MAX_DELAY)
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// the policy is exhausted
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(error) if error.is_retryable() => {
                if retries >= policy.max_retries {
                    warn!(operation = operation, retries = retries, error = %error, "Transaction retries exhausted");
                    return Err(CampusError::conflict(ConflictReason::Contention));
                }
                let delay = policy.delay_for_attempt(retries);
                debug!(operation = operation, retry = retries + 1, delay_ms = delay.as_millis() as u64, "Retrying transaction after serialization conflict");
                sleep(delay).await;
                retries += 1;
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::test_support::db_error;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy { max_retries, base_delay: Duration::from_millis(1) }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = &AtomicU32::new(0);
        let result = with_retry(&fast_policy(3), "register", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(CampusError::Database(db_error("40001")))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_contention() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(2), "check_in", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CampusError::Database(db_error("40P01")))
        })
        .await;

        assert_matches!(result, Err(CampusError::Conflict(ConflictReason::Contention)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(5), "register", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CampusError::conflict(ConflictReason::Full))
        })
        .await;

        assert_matches!(result, Err(CampusError::Conflict(ConflictReason::Full)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy { max_retries: 3, base_delay: Duration::from_millis(100) };
        assert!(policy.delay_for_attempt(0) >= Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(10), MAX_DELAY);
    }
}
