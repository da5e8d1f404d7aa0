//! Bounded retry of store operations with fatal escalation.

use std::future::Future;
use std::time::Duration;

use crate::core::{SchedulerError, StoreError};

/// Fixed-backoff retry policy for connectivity failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up.
    pub attempts: u32,
    /// Sleep between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run `op`, retrying it while it fails with connectivity loss.
    ///
    /// Non-connectivity errors are returned immediately. After `attempts`
    /// consecutive connectivity failures the result is [`SchedulerError::Fatal`].
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, SchedulerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut remaining = self.attempts;
        while remaining > 0 {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_connection_loss() => {
                    tracing::error!(
                        "cannot establish db connection during {what}: {err}. retries remaining: {remaining}"
                    );
                    remaining -= 1;
                    if remaining > 0 {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(err) => return Err(SchedulerError::Store(err)),
            }
        }
        tracing::error!("unable to establish database connection during {what}, quitting...");
        Err(SchedulerError::Fatal(format!(
            "{what}: connection lost after {} attempts",
            self.attempts
        )))
    }
}
