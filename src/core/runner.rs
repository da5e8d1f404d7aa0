//! Cooperative task runner driving a [`DelayQueue`] on the control thread.
//!
//! Every fired task is spawned onto a [`JoinSet`] on the current runtime so
//! a task suspended on I/O does not hold up the others. Task failures and
//! panics are logged and swallowed; only [`SchedulerError::Fatal`] ends the
//! loop.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::Instrument;

use crate::core::delay_queue::{DelayQueue, Next, TaskHandle};
use crate::core::waiter::{WakeReason, Waiter};
use crate::core::SchedulerError;

/// Result produced by a scheduled action.
pub type TaskResult = Result<(), SchedulerError>;

type Action = Box<dyn FnOnce() -> BoxFuture<'static, TaskResult> + Send>;

/// A unit of work owned by the delay queue until it fires or is cancelled.
pub struct Task {
    label: String,
    action: Action,
}

impl Task {
    /// Wrap a zero-argument async action.
    pub fn new<F, Fut>(label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Box::new(move || action().boxed()),
        }
    }

    /// Human readable label used for logging.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("label", &self.label).finish_non_exhaustive()
    }
}

struct Shared {
    queue: Mutex<DelayQueue<Task>>,
    changed: Notify,
    shutdown: AtomicBool,
}

/// Cloneable handle for scheduling and cancelling tasks on a runner.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl Default for SchedulerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("pending", &self.pending())
            .finish()
    }
}

impl SchedulerHandle {
    /// Create a handle with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(DelayQueue::new()),
                changed: Notify::new(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Schedule `action` to run after `delay`. Lower `priority` fires first
    /// among tasks with the same fire time.
    pub fn schedule<F, Fut>(
        &self,
        delay: Duration,
        priority: i32,
        label: impl Into<String>,
        action: F,
    ) -> TaskHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.schedule_task(delay, priority, Task::new(label, action))
    }

    /// Schedule an already built task.
    pub fn schedule_task(&self, delay: Duration, priority: i32, task: Task) -> TaskHandle {
        let handle = self
            .shared
            .queue
            .lock()
            .insert(Instant::now(), delay, priority, task);
        // A new task may be due earlier than the one the runner waits for.
        self.shared.changed.notify_one();
        handle
    }

    /// Cancel a pending task. Returns `false` if it already fired.
    pub fn cancel(&self, handle: TaskHandle) -> bool {
        let cancelled = self.shared.queue.lock().cancel(handle);
        if cancelled {
            self.shared.changed.notify_one();
        }
        cancelled
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Labels of pending tasks, earliest first.
    #[must_use]
    pub fn pending_labels(&self) -> Vec<String> {
        let queue = self.shared.queue.lock();
        let mut pending: Vec<_> = queue
            .iter_pending()
            .map(|(at, task)| (at, task.label.clone()))
            .collect();
        pending.sort_by_key(|(at, _)| *at);
        pending.into_iter().map(|(_, label)| label).collect()
    }

    /// Ask the runner to stop. In-flight tasks are aborted.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.changed.notify_one();
    }

    fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    fn pop_due(&self) -> Next<Task> {
        self.shared.queue.lock().pop_due(Instant::now())
    }
}

/// Hook invoked when the waiter reports a push notification.
pub type NotificationHook = Arc<dyn Fn(&SchedulerHandle) + Send + Sync>;

/// Single-threaded loop that fires due tasks and isolates their failures.
pub struct TaskRunner<W> {
    handle: SchedulerHandle,
    waiter: W,
    in_flight: JoinSet<TaskResult>,
    on_notify: Option<NotificationHook>,
}

impl<W: Waiter> TaskRunner<W> {
    /// Create a runner draining the queue behind `handle`.
    pub fn new(handle: SchedulerHandle, waiter: W) -> Self {
        Self {
            handle,
            waiter,
            in_flight: JoinSet::new(),
            on_notify: None,
        }
    }

    /// Install a hook called whenever the waiter wakes on a notification.
    #[must_use]
    pub fn with_notification_hook(mut self, hook: NotificationHook) -> Self {
        self.on_notify = Some(hook);
        self
    }

    /// The handle this runner drains.
    #[must_use]
    pub const fn handle(&self) -> &SchedulerHandle {
        &self.handle
    }

    /// Drain the queue until shutdown (`Ok`) or a fatal task error (`Err`).
    pub async fn run_forever(&mut self) -> Result<(), SchedulerError> {
        loop {
            if self.handle.is_shutdown() {
                tracing::info!("task runner shutting down");
                self.in_flight.shutdown().await;
                return Ok(());
            }

            if let Some(reason) = self.waiter.recover().await? {
                self.on_wake(reason);
                continue;
            }

            let timeout = match self.handle.pop_due() {
                Next::Due(task) => {
                    self.fire(task);
                    continue;
                }
                Next::Wait(delay) => Some(delay),
                Next::Idle => None,
            };

            let shared = Arc::clone(&self.handle.shared);
            tokio::select! {
                biased;
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    Self::reap(joined)?;
                }
                () = shared.changed.notified() => {}
                woke = self.waiter.wait(timeout) => self.on_wake(woke?),
            }
        }
    }

    fn on_wake(&self, reason: WakeReason) {
        match reason {
            WakeReason::Elapsed | WakeReason::Disconnected => {}
            WakeReason::Notified(_) | WakeReason::Resubscribed => {
                if let Some(hook) = &self.on_notify {
                    hook(&self.handle);
                }
            }
        }
    }

    fn fire(&mut self, task: Task) {
        let span = tracing::debug_span!("task", label = %task.label);
        tracing::trace!(parent: &span, "firing task");
        self.in_flight.spawn((task.action)().instrument(span));
    }

    fn reap(joined: Result<TaskResult, JoinError>) -> Result<(), SchedulerError> {
        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) if err.is_fatal() => {
                tracing::error!("fatal error in scheduled task: {err}");
                Err(err)
            }
            Ok(Err(err)) => {
                tracing::error!("unhandled error in scheduled task; ignoring it: {err}");
                Ok(())
            }
            Err(join_err) if join_err.is_panic() => {
                tracing::error!("scheduled task panicked; ignoring it: {join_err}");
                Ok(())
            }
            Err(join_err) => {
                tracing::debug!("scheduled task cancelled: {join_err}");
                Ok(())
            }
        }
    }
}
