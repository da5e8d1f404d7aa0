//! Tests for utility functions

use plugin_scheduler::util::{init_tracing, init_tracing_with, now_ms};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with("info,plugin_scheduler=debug");
    init_tracing();
    init_tracing_with("not a [valid filter");
    tracing::info!("tracing initialized");
}
