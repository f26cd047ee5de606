//! Fixed-interval polling with local cancellation.
//!
//! The control plane never pushes state changes, so every wait in the
//! system is a loop of fetch, inspect, sleep. [`Poller`] owns that loop and
//! the cancellation token that can abandon it.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, StackError};

/// Default interval between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Drives polling loops and guards remote calls against cancellation.
#[derive(Debug, Clone)]
pub struct Poller {
    /// Delay between two fetches.
    interval: Duration,
    /// Caller-supplied cancellation signal.
    cancel: CancellationToken,
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, CancellationToken::new())
    }
}

impl Poller {
    /// Creates a poller.
    #[must_use]
    pub const fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self { interval, cancel }
    }

    /// Returns the polling interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Fails if cancellation has been requested.
    ///
    /// Called before every remote call.
    ///
    /// # Errors
    ///
    /// Returns `StackError::Cancelled` naming the operation.
    pub fn ensure_active(&self, operation: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(StackError::cancelled(operation).into());
        }
        Ok(())
    }

    /// Fetches until `is_terminal` accepts the snapshot.
    ///
    /// Every iteration checks the cancellation token before fetching, and
    /// the sleep between iterations is interrupted by cancellation. There is
    /// no iteration cap.
    ///
    /// # Errors
    ///
    /// Returns the first error from `fetch` or `is_terminal`, or
    /// `StackError::Cancelled` if the token fires.
    pub async fn until<T, F, Fut, P>(
        &self,
        operation: &str,
        mut fetch: F,
        mut is_terminal: P,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: FnMut(&T) -> Result<bool>,
    {
        let mut attempt: u64 = 0;

        loop {
            self.ensure_active(operation)?;
            attempt += 1;

            let snapshot = fetch().await?;
            if is_terminal(&snapshot)? {
                debug!("{operation}: settled after {attempt} polls");
                return Ok(snapshot);
            }

            debug!("{operation}: poll {attempt} not terminal, waiting {:?}", self.interval);

            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Err(StackError::cancelled(operation).into());
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_poller() -> Poller {
        Poller::new(Duration::ZERO, CancellationToken::new())
    }

    #[tokio::test]
    async fn test_polls_until_terminal() {
        let poller = fast_poller();
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let value = poller
            .until(
                "counting",
                move || async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) },
                |n| Ok(*n >= 3),
            )
            .await
            .expect("poll should settle");

        assert_eq!(value, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_predicate_error_aborts() {
        let poller = fast_poller();

        let result: Result<u32> = poller
            .until(
                "failing",
                || async { Ok(1) },
                |_| Err(StackError::transport("failing", "boom").into()),
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_fetch() {
        let poller = fast_poller();
        poller.token().cancel();
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = poller
            .until(
                "waiting",
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                |_| Ok(false),
            )
            .await;

        assert!(result.expect_err("should be cancelled").is_cancelled());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_sleep() {
        let poller = Poller::new(Duration::from_secs(3600), CancellationToken::new());
        let token = poller.token().clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result = poller
            .until("sleeping", || async { Ok(()) }, |_| Ok(false))
            .await;

        assert!(result.expect_err("should be cancelled").is_cancelled());
    }

    #[test]
    fn test_ensure_active() {
        let poller = fast_poller();
        assert!(poller.ensure_active("describing stack").is_ok());
        poller.token().cancel();
        assert!(poller.ensure_active("describing stack").is_err());
    }
}
