//! Integration tests for the task runner.
//!
//! These tests validate:
//! - Fire order by time, then priority, then insertion
//! - Cancellation before and after firing
//! - Failures and panics in one task do not affect others
//! - Fatal errors stop the runner; shutdown aborts in-flight tasks
//!
//! All tests run on paused tokio time, so delays are virtual.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use plugin_scheduler::core::{SchedulerError, SchedulerHandle, SleepWaiter, TaskResult, TaskRunner};
use tokio::time::Instant;

type Log = Arc<Mutex<Vec<String>>>;

fn record(handle: &SchedulerHandle, log: &Log, delay_ms: u64, priority: i32, name: &'static str) {
    let log = Arc::clone(log);
    handle.schedule(Duration::from_millis(delay_ms), priority, name, move || async move {
        log.lock().push(name.to_string());
        Ok(())
    });
}

fn stop_after(handle: &SchedulerHandle, delay: Duration) {
    let stopper = handle.clone();
    handle.schedule(delay, i32::MAX, "stop", move || async move {
        stopper.shutdown();
        Ok(())
    });
}

async fn explode() -> TaskResult {
    panic!("handler panicked")
}

async fn run(handle: &SchedulerHandle) -> Result<(), SchedulerError> {
    TaskRunner::new(handle.clone(), SleepWaiter).run_forever().await
}

#[tokio::test(start_paused = true)]
async fn test_fire_order_time_then_priority_then_insertion() {
    let handle = SchedulerHandle::new();
    let log: Log = Arc::default();

    record(&handle, &log, 10, 1, "late-low");
    record(&handle, &log, 10, 0, "late-high-1");
    record(&handle, &log, 5, 5, "early");
    record(&handle, &log, 10, 0, "late-high-2");
    stop_after(&handle, Duration::from_millis(50));

    run(&handle).await.unwrap();

    assert_eq!(
        *log.lock(),
        vec!["early", "late-high-1", "late-high-2", "late-low"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_tasks_fire_no_earlier_than_their_delay() {
    let handle = SchedulerHandle::new();
    let start = Instant::now();
    let fired_at: Arc<Mutex<Option<Duration>>> = Arc::default();

    let slot = Arc::clone(&fired_at);
    handle.schedule(Duration::from_secs(30), 0, "check", move || async move {
        *slot.lock() = Some(start.elapsed());
        Ok(())
    });
    stop_after(&handle, Duration::from_secs(31));

    run(&handle).await.unwrap();

    let elapsed = fired_at.lock().unwrap();
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed < Duration::from_secs(31));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_task_never_runs() {
    let handle = SchedulerHandle::new();
    let log: Log = Arc::default();

    let log_clone = Arc::clone(&log);
    let doomed = handle.schedule(Duration::from_secs(5), 0, "doomed", move || async move {
        log_clone.lock().push("doomed".into());
        Ok(())
    });
    record(&handle, &log, 1, 0, "kept");
    assert_eq!(handle.pending(), 2);

    assert!(handle.cancel(doomed));
    assert!(!handle.cancel(doomed));
    assert_eq!(handle.pending(), 1);
    stop_after(&handle, Duration::from_secs(10));

    run(&handle).await.unwrap();
    assert_eq!(*log.lock(), vec!["kept"]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_fire_returns_false() {
    let handle = SchedulerHandle::new();
    let log: Log = Arc::default();
    let fired = handle.schedule(Duration::ZERO, 0, "fired", || async { Ok(()) });
    record(&handle, &log, 1, 0, "marker");
    stop_after(&handle, Duration::from_millis(5));

    run(&handle).await.unwrap();
    assert!(!handle.cancel(fired));
}

#[tokio::test(start_paused = true)]
async fn test_failures_and_panics_are_isolated() {
    let handle = SchedulerHandle::new();
    let log: Log = Arc::default();

    handle.schedule(Duration::from_millis(1), 0, "fails", || async {
        Err(SchedulerError::Task("handler blew up".into()))
    });
    handle.schedule(Duration::from_millis(2), 0, "panics", explode);
    record(&handle, &log, 3, 0, "survivor");
    stop_after(&handle, Duration::from_millis(10));

    run(&handle).await.unwrap();
    assert_eq!(*log.lock(), vec!["survivor"]);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_stops_runner() {
    let handle = SchedulerHandle::new();
    let log: Log = Arc::default();

    handle.schedule(Duration::from_millis(1), 0, "fatal", || async {
        Err(SchedulerError::Fatal("database gone".into()))
    });
    record(&handle, &log, 100, 0, "never");

    let err = run(&handle).await.unwrap_err();
    assert!(err.is_fatal());
    assert!(log.lock().is_empty());
    assert_eq!(handle.pending_labels(), vec!["never"]);
}

#[tokio::test(start_paused = true)]
async fn test_task_scheduled_by_task_wakes_runner_early() {
    let handle = SchedulerHandle::new();
    let log: Log = Arc::default();

    record(&handle, &log, 100_000, 0, "far");
    let inner = handle.clone();
    let inner_log = Arc::clone(&log);
    handle.schedule(Duration::from_secs(1), 0, "spawner", move || async move {
        record(&inner, &inner_log, 1_000, 0, "near");
        Ok(())
    });
    stop_after(&handle, Duration::from_secs(50));

    run(&handle).await.unwrap();
    assert_eq!(*log.lock(), vec!["near"]);
    assert_eq!(handle.pending_labels(), vec!["far"]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_aborts_in_flight_tasks() {
    let handle = SchedulerHandle::new();
    let log: Log = Arc::default();

    let slow_log = Arc::clone(&log);
    handle.schedule(Duration::ZERO, 0, "slow", move || async move {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        slow_log.lock().push("slow finished".into());
        Ok(())
    });
    stop_after(&handle, Duration::from_secs(1));

    run(&handle).await.unwrap();
    assert!(log.lock().is_empty());
}
