//! In-process notification channel.
//!
//! Stands in for a database LISTEN/NOTIFY side channel: stores publish on a
//! named channel and the engine's waiter receives. The connection can be
//! broken on purpose, and subscribes can be made to fail, to exercise the
//! resubscribe path.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::Mutex;

use crate::core::{Notification, NotificationSource, StoreError};

const CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum Signal {
    Notify(String),
    Disconnect,
}

/// Broadcast hub listened to on a single channel name.
pub struct NotificationHub {
    channel: String,
    sender: broadcast::Sender<Signal>,
    receiver: Mutex<Option<broadcast::Receiver<Signal>>>,
    failing_subscribes: AtomicUsize,
    subscribes: AtomicUsize,
}

impl NotificationHub {
    /// Create a hub whose subscriber listens on `channel`.
    pub fn new(channel: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self {
            channel: channel.into(),
            sender,
            receiver: Mutex::new(None),
            failing_subscribes: AtomicUsize::new(0),
            subscribes: AtomicUsize::new(0),
        }
    }

    /// Publish a notification on `channel`. Dropped if nobody listens.
    pub fn publish(&self, channel: &str) {
        if self.sender.send(Signal::Notify(channel.to_string())).is_err() {
            tracing::trace!(channel, "notification dropped, no subscriber");
        }
    }

    /// Drop the subscriber's connection; its next receive fails.
    pub fn break_connection(&self) {
        tracing::debug!("breaking notification connection");
        let _ = self.sender.send(Signal::Disconnect);
    }

    /// Make the next `n` subscribe attempts fail with a connection error.
    pub fn fail_next_subscribes(&self, n: usize) {
        self.failing_subscribes.store(n, Ordering::Release);
    }

    /// Number of successful subscribes so far.
    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::Acquire)
    }

    fn lost(reason: &str) -> StoreError {
        StoreError::ConnectionLost(reason.to_string())
    }
}

#[async_trait]
impl NotificationSource for NotificationHub {
    async fn subscribe(&self) -> Result<(), StoreError> {
        let failing = self
            .failing_subscribes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(Self::lost("subscribe refused"));
        }
        *self.receiver.lock().await = Some(self.sender.subscribe());
        self.subscribes.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(channel = %self.channel, "listening for notifications");
        Ok(())
    }

    async fn recv(&self) -> Result<Notification, StoreError> {
        let mut guard = self.receiver.lock().await;
        let Some(rx) = guard.as_mut() else {
            return Err(Self::lost("not subscribed"));
        };
        loop {
            match rx.recv().await {
                Ok(Signal::Notify(channel)) if channel == self.channel => {
                    return Ok(Notification { channel });
                }
                Ok(Signal::Notify(_)) => {}
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!("notification subscriber lagged by {missed}");
                    return Ok(Notification {
                        channel: self.channel.clone(),
                    });
                }
                Ok(Signal::Disconnect) | Err(RecvError::Closed) => {
                    *guard = None;
                    return Err(Self::lost("notification connection closed"));
                }
            }
        }
    }

    fn try_recv(&self) -> Option<Notification> {
        let mut guard = self.receiver.try_lock().ok()?;
        let rx = guard.as_mut()?;
        loop {
            match rx.try_recv() {
                Ok(Signal::Notify(channel)) if channel == self.channel => {
                    return Some(Notification { channel });
                }
                Ok(Signal::Notify(_)) => {}
                Err(TryRecvError::Lagged(_)) => {
                    return Some(Notification {
                        channel: self.channel.clone(),
                    });
                }
                Ok(Signal::Disconnect) | Err(TryRecvError::Closed) => {
                    *guard = None;
                    return None;
                }
                Err(TryRecvError::Empty) => return None,
            }
        }
    }
}
