//! Interruptible waiting: sleep until a deadline or an external notification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{RetryPolicy, SchedulerError, StoreError};

/// A push notification received from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Channel the notification was published on.
    pub channel: String,
}

/// Why a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The requested duration elapsed.
    Elapsed,
    /// One or more notifications arrived; the count covers the drained burst.
    Notified(usize),
    /// The channel broke; [`Waiter::recover`] must run before the next wait.
    Disconnected,
    /// The channel broke and was successfully resubscribed.
    Resubscribed,
}

/// Push-notification side channel of a persistent store.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// (Re)establish the subscription.
    async fn subscribe(&self) -> Result<(), StoreError>;
    /// Wait for the next notification. Must be cancel safe.
    async fn recv(&self) -> Result<Notification, StoreError>;
    /// Take an already-queued notification without waiting.
    fn try_recv(&self) -> Option<Notification> {
        None
    }
}

/// Blocking wait used by the task runner when nothing is due.
#[async_trait]
pub trait Waiter: Send {
    /// Wait up to `max` (forever when `None`), returning early on notification.
    async fn wait(&mut self, max: Option<Duration>) -> Result<WakeReason, SchedulerError>;

    /// Repair a broken waiter. The runner awaits this on its own, never raced
    /// against task completion, so a bounded retry inside runs to the end.
    async fn recover(&mut self) -> Result<Option<WakeReason>, SchedulerError> {
        Ok(None)
    }
}

/// Waiter without a notification source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepWaiter;

#[async_trait]
impl Waiter for SleepWaiter {
    async fn wait(&mut self, max: Option<Duration>) -> Result<WakeReason, SchedulerError> {
        match max {
            Some(delay) => tokio::time::sleep(delay).await,
            None => std::future::pending::<()>().await,
        }
        Ok(WakeReason::Elapsed)
    }
}

/// Waiter that also listens on a [`NotificationSource`], resubscribing with
/// bounded retry when the channel reports a broken connection.
pub struct NotifyWaiter {
    source: Arc<dyn NotificationSource>,
    retry: RetryPolicy,
    subscribed: bool,
}

impl NotifyWaiter {
    /// Create a waiter. The source is assumed to be already subscribed.
    pub fn new(source: Arc<dyn NotificationSource>, retry: RetryPolicy) -> Self {
        Self {
            source,
            retry,
            subscribed: true,
        }
    }

    async fn resubscribe(&mut self) -> Result<(), SchedulerError> {
        let source = Arc::clone(&self.source);
        self.retry
            .run("notification resubscribe", || {
                let source = Arc::clone(&source);
                async move { source.subscribe().await }
            })
            .await?;
        self.subscribed = true;
        tracing::info!("resubscribed to store notifications");
        Ok(())
    }
}

#[async_trait]
impl Waiter for NotifyWaiter {
    async fn wait(&mut self, max: Option<Duration>) -> Result<WakeReason, SchedulerError> {
        if !self.subscribed {
            return Ok(WakeReason::Disconnected);
        }

        let received = match max {
            Some(delay) => match tokio::time::timeout(delay, self.source.recv()).await {
                Ok(received) => received,
                Err(_) => return Ok(WakeReason::Elapsed),
            },
            None => self.source.recv().await,
        };

        match received {
            Ok(_) => {
                let mut count = 1;
                while self.source.try_recv().is_some() {
                    count += 1;
                }
                tracing::debug!("got {count} event notification(s) from store");
                Ok(WakeReason::Notified(count))
            }
            Err(err) => {
                tracing::warn!("notification channel failed: {err}; resubscribing");
                self.subscribed = false;
                Ok(WakeReason::Disconnected)
            }
        }
    }

    async fn recover(&mut self) -> Result<Option<WakeReason>, SchedulerError> {
        if self.subscribed {
            return Ok(None);
        }
        self.resubscribe().await?;
        Ok(Some(WakeReason::Resubscribed))
    }
}
