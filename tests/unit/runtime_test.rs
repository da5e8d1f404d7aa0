//! Tests for the control thread runtime

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use plugin_scheduler::core::{SchedulerError, SchedulerHandle};
use plugin_scheduler::runtime::{exit_code, ControlThread, EXIT_FATAL, EXIT_OK};

#[test]
fn test_control_thread_runs_tasks_until_shutdown() {
    let control = ControlThread::new().unwrap();
    let handle = SchedulerHandle::new();
    let runs = Arc::new(AtomicUsize::new(0));

    for delay in [1, 2, 3] {
        let runs = Arc::clone(&runs);
        handle.schedule(Duration::from_millis(delay), 0, "count", move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    let stopper = handle.clone();
    handle.schedule(Duration::from_millis(20), 0, "stop", move || async move {
        stopper.shutdown();
        Ok(())
    });

    let result = control.run_scheduler(handle);
    assert!(result.is_ok());
    assert_eq!(exit_code(&result), EXIT_OK);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn test_control_thread_returns_fatal_error() {
    let control = ControlThread::new().unwrap();
    let handle = SchedulerHandle::new();
    handle.schedule(Duration::ZERO, 0, "fatal", || async {
        Err(SchedulerError::Fatal("lost database".to_string()))
    });

    let result = control.run_scheduler(handle);
    assert!(matches!(result, Err(SchedulerError::Fatal(_))));
    assert_eq!(exit_code(&result), EXIT_FATAL);
}
