//! Bounded retry with fixed or linear backoff.
//!
//! One [`RetryPolicy`] value describes how often and how patiently an
//! operation is retried. Chapter fetching and file persistence use separate
//! presets of the same combinator.

use std::future::Future;
use std::time::Duration;

use crate::{NarouError, Result};

/// Delay applied before a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `step × attempt index` before the retry with that index.
    Linear(Duration),
}

/// How many attempts an operation gets and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Chapter fetch preset: 3 attempts, waiting 1 s then 2 s.
    pub const fn chapter_fetch() -> Self {
        Self { max_attempts: 3, backoff: Backoff::Linear(Duration::from_secs(1)) }
    }

    /// File save preset: 3 attempts, waiting 2 s before each retry.
    pub const fn file_save() -> Self {
        Self { max_attempts: 3, backoff: Backoff::Fixed(Duration::from_secs(2)) }
    }

    /// Policy that retries `max_attempts` times without waiting.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, backoff: Backoff::Fixed(Duration::ZERO) }
    }

    /// Delay before the attempt with 0-based index `attempt`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step.saturating_mul(attempt),
        }
    }

    /// Runs `op` until it succeeds or the attempts run out.
    ///
    /// `op` receives the 0-based attempt index. The first success is returned
    /// immediately; if every attempt fails the error of the last one is
    /// wrapped in [`NarouError::RetriesExhausted`] together with `target`.
    pub async fn run<T, F, Fut>(&self, target: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            let delay = self.delay_before(attempt);
            if attempt > 0 {
                tracing::info!(target_name = target, attempt = attempt + 1, attempts, "retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            match op(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(target_name = target, attempt = attempt + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(target_name = target, attempt = attempt + 1, attempts, error = %e, "attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(NarouError::RetriesExhausted {
            attempts,
            target: target.to_string(),
            source: Box::new(last_error.unwrap_or(NarouError::NoContent)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_presets() {
        let fetch = RetryPolicy::chapter_fetch();
        assert_eq!(fetch.max_attempts, 3);
        assert_eq!(fetch.delay_before(0), Duration::ZERO);
        assert_eq!(fetch.delay_before(1), Duration::from_secs(1));
        assert_eq!(fetch.delay_before(2), Duration::from_secs(2));

        let save = RetryPolicy::file_save();
        assert_eq!(save.delay_before(1), Duration::from_secs(2));
        assert_eq!(save.delay_before(2), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let calls = Cell::new(0);
        let result = RetryPolicy::immediate(3)
            .run("op", |_| {
                calls.set(calls.get() + 1);
                async { Ok::<_, NarouError>(7) }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_last_attempt() {
        let result = RetryPolicy::immediate(3)
            .run("op", |attempt| async move {
                if attempt < 2 { Err(NarouError::NoContent) } else { Ok(attempt) }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let result: Result<()> = RetryPolicy::immediate(3)
            .run("chapter x", |attempt| async move {
                if attempt == 2 {
                    Err(NarouError::Timeout { timeout: 10 })
                } else {
                    Err(NarouError::NoContent)
                }
            })
            .await;

        match result {
            Err(NarouError::RetriesExhausted { attempts, target, source }) => {
                assert_eq!(attempts, 3);
                assert_eq!(target, "chapter x");
                assert!(matches!(*source, NarouError::Timeout { timeout: 10 }));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_chapter_fetch_backoff_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let result: Result<()> =
            RetryPolicy::chapter_fetch().run("chapter", |_| async { Err(NarouError::NoContent) }).await;

        assert!(matches!(result, Err(NarouError::RetriesExhausted { attempts: 3, .. })));
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_file_save_backoff_is_fixed() {
        let start = tokio::time::Instant::now();
        let result = RetryPolicy::file_save()
            .run("file", |attempt| async move { if attempt < 1 { Err(NarouError::NoContent) } else { Ok(()) } })
            .await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let calls = Cell::new(0);
        let _ = RetryPolicy::immediate(0)
            .run("op", |_| {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(NarouError::NoContent) }
            })
            .await;

        assert_eq!(calls.get(), 1);
    }
}
