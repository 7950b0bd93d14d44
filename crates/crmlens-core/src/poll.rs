//! Poll-until-ready combinator.
//!
//! Several collaborators come up asynchronously: the host page's script
//! global, a freshly relaunched service worker, a tab still navigating.
//! Every "wait for it with a short retry" site goes through this one
//! combinator so the policy is defined and tested once.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

/// Retry policy: fixed interval, bounded attempts.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between attempts.
    pub interval: Duration,
    /// Total attempts before giving up.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_attempts: 10,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// The condition never became true within the attempt budget.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("Condition not met after {attempts} attempts")]
    Expired { attempts: u32 },
}

/// Run `probe` until it yields a value or the attempt budget runs out.
///
/// The probe returning `None` means "not there yet"; the caller decides
/// what "there" is. No sleep follows the final attempt.
pub async fn poll_until<F, Fut, T>(config: &PollConfig, mut probe: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let attempts = config.max_attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        debug!(attempt, max = attempts, "poll condition not met");
        if attempt < attempts {
            sleep(config.interval).await;
        }
    }
    Err(PollError::Expired { attempts })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_immediate_success() {
        let config = PollConfig::new(Duration::from_millis(1), 3);
        let result = poll_until(&config, || async { Some(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_success_after_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = PollConfig::new(Duration::from_millis(1), 5);

        let result = poll_until(&config, || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) >= 2 {
                    Some("ready")
                } else {
                    None
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_expires_after_bounded_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = PollConfig::new(Duration::from_millis(1), 4);

        let result: Result<(), _> = poll_until(&config, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                None
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), PollError::Expired { attempts: 4 });
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_attempts_clamped_to_one() {
        let config = PollConfig::new(Duration::from_millis(1), 0);
        let result = poll_until(&config, || async { Some(1) }).await;
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.interval, Duration::from_millis(100));
    }
}
