use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Wording that marks an error as worth retrying.
const TRANSIENT_KEYWORDS: &[&str] = &[
    "timeout",
    "timed out",
    "connection",
    "network",
    "temporary",
    "unavailable",
    "busy",
    "locked",
];

/// Wording that marks an error as permanent, even next to a transient keyword.
const PERMANENT_KEYWORDS: &[&str] = &["not found", "permission denied", "invalid", "already exists"];

/// Classify an error by its message.
pub fn is_transient_error(message: &str) -> bool {
    let message = message.to_lowercase();
    if PERMANENT_KEYWORDS.iter().any(|k| message.contains(k)) {
        return false;
    }
    TRANSIENT_KEYWORDS.iter().any(|k| message.contains(k))
}

/// Exponential backoff: `delay(n) = min(max_delay, base_delay * multiplier^n)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

/// A value (or error) together with how many retries it took.
#[derive(Debug)]
pub struct Retried<T> {
    pub value: T,
    pub retries: u32,
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub fn should_retry(&self, attempt: u32, error: &impl Display) -> bool {
        attempt < self.max_retries && is_transient_error(&error.to_string())
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of retries,
    /// sleeping [`RetryPolicy::delay`] between attempts.
    pub async fn retry<T, E, F, Fut>(&self, item: &str, mut op: F) -> Result<Retried<T>, Retried<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        retries: attempt,
                    })
                }
                Err(error) if self.should_retry(attempt, &error) => {
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        item,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        "Retrying after {:.2}s: {error}",
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(Retried {
                        value: error,
                        retries: attempt,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(10), Duration::from_secs(60));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient_error("Connection reset by peer"));
        assert!(is_transient_error("operation TIMED OUT"));
        assert!(is_transient_error("Store unavailable: db busy"));
        assert!(!is_transient_error("Item not found: a/b"));
        assert!(!is_transient_error("Invalid key: ../x"));
        // Permanent wording wins.
        assert!(!is_transient_error("connection string invalid"));
        assert!(!is_transient_error("disk full"));
    }

    #[test]
    fn test_should_retry_respects_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, &"timeout"));
        assert!(policy.should_retry(4, &"timeout"));
        assert!(!policy.should_retry(5, &"timeout"));
        assert!(!policy.should_retry(0, &"not found"));
        assert!(!RetryPolicy::none().should_retry(0, &"timeout"));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let calls = Cell::new(0);
        let result = fast(5)
            .retry("a/b", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err("network down")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result.value, 3);
        assert_eq!(result.retries, 2);
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let calls = Cell::new(0);
        let err = fast(5)
            .retry("a/b", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>("permission denied") }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert_eq!(err.retries, 0);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let calls = Cell::new(0);
        let err = fast(2)
            .retry("a/b", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>("busy") }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.get(), 3);
        assert_eq!(err.retries, 2);
        assert_eq!(err.value, "busy");
    }
}
