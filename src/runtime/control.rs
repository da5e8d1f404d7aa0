//! The single control thread that every scheduled task runs on.

use std::future::Future;
use std::sync::Arc;

use crate::core::{NotificationSource, SchedulerError, SchedulerHandle, SleepWaiter, TaskRunner};
use crate::eventengine::EventEngine;

/// Exit status for a clean shutdown.
pub const EXIT_OK: i32 = 0;
/// Exit status after a fatal error.
pub const EXIT_FATAL: i32 = 1;

/// Current-thread tokio runtime hosting a task runner.
///
/// Tasks spawned by the runner interleave only at their await points, so
/// scheduler state needs no cross-thread coordination beyond what the
/// handle already does.
pub struct ControlThread {
    runtime: tokio::runtime::Runtime,
}

impl ControlThread {
    /// Build the runtime.
    pub fn new() -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    /// Run an arbitrary future to completion on the control thread.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Drive an event engine until shutdown or a fatal error.
    pub fn run_engine(
        &self,
        engine: &Arc<EventEngine>,
        notifications: Arc<dyn NotificationSource>,
    ) -> Result<(), SchedulerError> {
        self.block_on(engine.run(notifications))
    }

    /// Drive a plain task runner (no notification source) on `handle`.
    pub fn run_scheduler(&self, handle: SchedulerHandle) -> Result<(), SchedulerError> {
        self.block_on(async move {
            let mut runner = TaskRunner::new(handle, SleepWaiter);
            runner.run_forever().await
        })
    }
}

/// Process exit status for a runner result.
#[must_use]
pub const fn exit_code(result: &Result<(), SchedulerError>) -> i32 {
    match result {
        Ok(()) => EXIT_OK,
        Err(_) => EXIT_FATAL,
    }
}

/// Log the outcome and terminate the process with the matching status.
pub fn exit_with(result: Result<(), SchedulerError>) -> ! {
    match &result {
        Ok(()) => tracing::info!("scheduler stopped"),
        Err(err) => tracing::error!("scheduler stopped on fatal error: {err}"),
    }
    std::process::exit(exit_code(&result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Ok(())), 0);
        assert_eq!(exit_code(&Err(SchedulerError::Fatal("db gone".into()))), 1);
    }

    #[test]
    fn test_scheduler_stops_on_shutdown_task() {
        let control = ControlThread::new().unwrap();
        let handle = SchedulerHandle::new();
        let stopper = handle.clone();
        handle.schedule(std::time::Duration::from_millis(5), 0, "stop", move || async move {
            stopper.shutdown();
            Ok(())
        });
        assert!(control.run_scheduler(handle).is_ok());
    }
}
