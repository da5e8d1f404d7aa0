//! Per-target polling schedule.
//!
//! Does not use a fixed-rate timer: the next run for a target is scheduled
//! a fixed interval after the previous run ends, so an overrunning run never
//! overlaps the next one. Runs are serialized per target key; an attempt
//! to start a run for a busy key is parked until the busy run completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::{Registry, SchedulerHandle, TaskHandle};
use crate::poll::plugin::PluginType;
use crate::poll::run::RunContext;
use crate::poll::target::NetworkTarget;

const POLL_PRIORITY: i32 = 0;

/// Result of asking to start a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAttempt {
    /// A run started with this identifier.
    Started(Uuid),
    /// Another run holds the key; this attempt retries when it completes.
    Deferred,
}

type Continuation = Box<dyn FnOnce() + Send>;

struct InFlight {
    run_id: Uuid,
    target_name: String,
    target_ptr: usize,
    waiters: Vec<Continuation>,
}

struct Inner<T: NetworkTarget> {
    scheduler: SchedulerHandle,
    plugins: Registry<dyn PluginType<T>>,
    interval: Duration,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

/// Runs ordered plugin chains against many targets, at most one run per
/// target key at any time.
pub struct PollScheduler<T: NetworkTarget> {
    inner: Arc<Inner<T>>,
}

impl<T: NetworkTarget> Clone for PollScheduler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: NetworkTarget> PollScheduler<T> {
    /// Create a scheduler driving runs on `scheduler`'s task runner.
    pub fn new(
        scheduler: SchedulerHandle,
        plugins: Registry<dyn PluginType<T>>,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                scheduler,
                plugins,
                interval,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Interval between end of a run and start of the next.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Start the polling schedule for `target`.
    pub fn start(&self, target: Arc<T>) -> PollAttempt {
        self.do_poll(target)
    }

    /// Whether a run is in flight for `key`.
    #[must_use]
    pub fn is_running(&self, key: &str) -> bool {
        self.inner.in_flight.lock().contains_key(key)
    }

    /// Keys with a run in flight.
    #[must_use]
    pub fn in_flight(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.in_flight.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of attempts parked behind the run for `key`.
    #[must_use]
    pub fn waiting(&self, key: &str) -> usize {
        self.inner
            .in_flight
            .lock()
            .get(key)
            .map_or(0, |run| run.waiters.len())
    }

    fn do_poll(&self, target: Arc<T>) -> PollAttempt {
        let key = target.key();
        let mut in_flight = self.inner.in_flight.lock();

        if let Some(busy) = in_flight.get_mut(&key) {
            tracing::info!(
                "schedule clash: waiting for run for {} to finish before starting run for {}",
                busy.target_name,
                target.display_name()
            );
            if busy.target_ptr == Arc::as_ptr(&target) as usize {
                tracing::debug!("clashing instances are identical");
            }
            let this = self.clone();
            busy.waiters.push(Box::new(move || {
                this.do_poll(target);
            }));
            return PollAttempt::Deferred;
        }

        let run = RunContext::new(Arc::clone(&target), &self.inner.plugins);
        let run_id = run.id();
        in_flight.insert(
            key.clone(),
            InFlight {
                run_id,
                target_name: target.display_name().to_string(),
                target_ptr: Arc::as_ptr(&target) as usize,
                waiters: Vec::new(),
            },
        );
        drop(in_flight);

        let this = self.clone();
        self.inner.scheduler.schedule(
            Duration::ZERO,
            POLL_PRIORITY,
            format!("poll run {}", target.display_name()),
            move || async move {
                let outcome = run.run().await;
                tracing::debug!(target_name = target.display_name(), "run finished: {outcome:?}");
                this.complete(&key, run_id, target);
                Ok(())
            },
        );
        PollAttempt::Started(run_id)
    }

    fn complete(&self, key: &str, run_id: Uuid, target: Arc<T>) {
        let waiters = {
            let mut in_flight = self.inner.in_flight.lock();
            let registered = in_flight.get(key).is_some_and(|run| run.run_id == run_id);
            if registered {
                in_flight.remove(key).map(|run| run.waiters).unwrap_or_default()
            } else {
                tracing::warn!(key, "completed run was not registered for its key");
                Vec::new()
            }
        };

        // Completion signal: parked attempts retry now that the key is free.
        for waiter in waiters {
            waiter();
        }

        self.reschedule(target);
    }

    fn reschedule(&self, target: Arc<T>) -> TaskHandle {
        let interval = self.inner.interval;
        tracing::debug!(
            "rescheduling polling for {} in {:?}",
            target.display_name(),
            interval
        );
        let this = self.clone();
        self.inner.scheduler.schedule(
            interval,
            POLL_PRIORITY,
            format!("poll schedule {}", target.display_name()),
            move || async move {
                this.do_poll(target);
                Ok(())
            },
        )
    }
}
