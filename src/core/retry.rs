use crate::error::{Result, UupError};
use backon::{BlockingRetryable, ConstantBuilder};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Blocks the current thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded retry with a fixed delay, driven by `backon`.
///
/// Only errors for which [`UupError::is_retryable`] holds (rate limiting and
/// transport failures) are retried. Anything else is returned on the spot.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
    sleeper: Rc<dyn Sleeper>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self::with_sleeper(max_retries, delay, Rc::new(ThreadSleeper))
    }

    pub fn with_sleeper(max_retries: u32, delay: Duration, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            max_retries: max_retries.max(1),
            delay,
            sleeper,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn attempt<T, F>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let retries = Cell::new(0u32);
        let sleeper = Rc::clone(&self.sleeper);
        let backoff = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times((self.max_retries - 1) as usize);

        let result = operation
            .retry(backoff)
            .sleep(move |delay: Duration| sleeper.sleep(delay))
            .when(UupError::is_retryable)
            .notify(|e: &UupError, delay: Duration| {
                retries.set(retries.get() + 1);
                let attempt = retries.get();
                debug!(
                    attempt,
                    max = self.max_retries,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "retrying after transient failure"
                );
                println!(
                    "⏳ {e}, retrying in {}s ({attempt}/{})",
                    delay.as_secs(),
                    self.max_retries
                );
            })
            .call();

        match result {
            Err(e) if e.is_retryable() => {
                let attempts = retries.get() + 1;
                warn!(attempts, error = %e, "retry budget exhausted");
                Err(UupError::RetryExhausted {
                    attempts,
                    source: Box::new(e),
                })
            }
            other => other,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records requested sleeps instead of blocking.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub sleeps: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    /// A policy that never blocks, for tests of callers.
    pub fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::with_sleeper(
            max_retries,
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            Rc::new(RecordingSleeper::default()),
        )
    }

    fn rate_limited() -> UupError {
        UupError::RateLimited {
            url: "https://api.example/fetch".to_string(),
        }
    }

    #[test]
    fn test_succeeds_after_k_rate_limits() {
        let sleeper = Rc::new(RecordingSleeper::default());
        let policy = RetryPolicy::with_sleeper(5, Duration::from_secs(5), sleeper.clone());
        let calls = Cell::new(0);

        let result = policy.attempt(|| {
            calls.set(calls.get() + 1);
            if calls.get() <= 3 {
                Err(rate_limited())
            } else {
                Ok("payload")
            }
        });

        assert_eq!(result.unwrap(), "payload");
        assert_eq!(calls.get(), 4);
        assert_eq!(*sleeper.sleeps.borrow(), vec![Duration::from_secs(5); 3]);
    }

    #[test]
    fn test_always_rate_limited_exhausts() {
        let sleeper = Rc::new(RecordingSleeper::default());
        let policy = RetryPolicy::with_sleeper(5, Duration::from_secs(5), sleeper.clone());
        let calls = Cell::new(0);

        let result: Result<()> = policy.attempt(|| {
            calls.set(calls.get() + 1);
            Err(rate_limited())
        });

        match result {
            Err(UupError::RetryExhausted { attempts, source }) => {
                assert_eq!(attempts, 5);
                assert!(matches!(*source, UupError::RateLimited { .. }));
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
        assert_eq!(calls.get(), 5);
        assert_eq!(sleeper.sleeps.borrow().len(), 4);
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let sleeper = Rc::new(RecordingSleeper::default());
        let policy = RetryPolicy::with_sleeper(5, Duration::from_secs(5), sleeper.clone());
        let calls = Cell::new(0);

        let result: Result<()> = policy.attempt(|| {
            calls.set(calls.get() + 1);
            Err(UupError::parse_error("no updateArray"))
        });

        assert!(matches!(result, Err(UupError::StructuralParse { .. })));
        assert_eq!(calls.get(), 1);
        assert!(sleeper.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_http_status_is_not_retried() {
        let policy = instant_policy(5);
        let calls = Cell::new(0);

        let result: Result<()> = policy.attempt(|| {
            calls.set(calls.get() + 1);
            Err(UupError::HttpStatus {
                url: "https://api.example/fetch".to_string(),
                status: 503,
            })
        });

        assert!(matches!(result, Err(UupError::HttpStatus { status: 503, .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_transport_errors_are_retried() {
        let policy = instant_policy(3);
        let calls = Cell::new(0);

        let result = policy.attempt(|| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(UupError::transport_error("https://x", "timed out"))
            } else {
                Ok(42)
            }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_zero_budget_still_tries_once() {
        let policy = instant_policy(0);
        assert_eq!(policy.max_retries(), 1);
        let result: Result<()> = policy.attempt(|| Err(rate_limited()));
        assert!(matches!(
            result,
            Err(UupError::RetryExhausted { attempts: 1, .. })
        ));
    }
}
