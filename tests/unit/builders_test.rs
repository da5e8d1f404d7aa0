//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use plugin_scheduler::builders::{build_event_engine, build_poll_scheduler};
use plugin_scheduler::config::SchedulerConfig;
use plugin_scheduler::core::{SchedulerError, SchedulerHandle};
use plugin_scheduler::eventengine::InMemoryAlertSink;
use plugin_scheduler::infra::InMemoryEventQueue;
use plugin_scheduler::poll::Netbox;

#[test]
fn test_build_event_engine_from_defaults() {
    let cfg = SchedulerConfig::default();
    let engine = build_event_engine(
        &cfg,
        Arc::new(InMemoryEventQueue::new()),
        Arc::new(InMemoryAlertSink::new(10)),
        Vec::new(),
        SchedulerHandle::new(),
    )
    .unwrap();
    assert_eq!(engine.target(), "eventEngine");
    assert_eq!(engine.scheduler().pending(), 0);
}

#[test]
fn test_build_event_engine_rejects_invalid_config() {
    let mut cfg = SchedulerConfig::default();
    cfg.engine.check_interval_secs = 0;
    let err = build_event_engine(
        &cfg,
        Arc::new(InMemoryEventQueue::new()),
        Arc::new(InMemoryAlertSink::new(10)),
        Vec::new(),
        SchedulerHandle::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[test]
fn test_build_poll_scheduler_uses_configured_interval() {
    let mut cfg = SchedulerConfig::default();
    cfg.poll.interval_secs = 300;
    let scheduler = build_poll_scheduler::<Netbox>(&cfg, SchedulerHandle::new(), Vec::new()).unwrap();
    assert_eq!(scheduler.interval(), Duration::from_secs(300));
    assert!(scheduler.in_flight().is_empty());
}

#[test]
fn test_build_poll_scheduler_rejects_zero_interval() {
    let mut cfg = SchedulerConfig::default();
    cfg.poll.interval_secs = 0;
    assert!(build_poll_scheduler::<Netbox>(&cfg, SchedulerHandle::new(), Vec::new()).is_err());
}
