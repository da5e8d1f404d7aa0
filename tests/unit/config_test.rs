//! Tests for configuration validation

use std::io::Write;
use std::time::Duration;

use plugin_scheduler::config::{EngineConfig, PollConfig, RetryConfig, SchedulerConfig};

#[test]
fn test_engine_config_defaults() {
    let cfg = EngineConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.check_interval(), Duration::from_secs(30));
    assert_eq!(cfg.query_retry, RetryConfig { attempts: 3, delay_secs: 2 });
    assert_eq!(cfg.subscribe_retry, RetryConfig { attempts: 3, delay_secs: 5 });
}

#[test]
fn test_engine_config_invalid_target() {
    let invalid = EngineConfig {
        target: "  ".to_string(),
        ..EngineConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_engine_config_invalid_interval() {
    let invalid = EngineConfig {
        check_interval_secs: 0,
        ..EngineConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_poll_config_invalid_interval() {
    let invalid = PollConfig { interval_secs: 0 };
    assert!(invalid.validate().is_err());
    assert!(PollConfig::default().validate().is_ok());
}

#[test]
fn test_scheduler_config_from_json() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{
            "engine": {"target": "eventEngine", "check_interval_secs": 5},
            "log_filter": "debug"
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.engine.check_interval_secs, 5);
    assert_eq!(cfg.engine.query_retry.attempts, 3);
    assert_eq!(cfg.poll.interval_secs, 10);
    assert_eq!(cfg.log_filter.as_deref(), Some("debug"));
}

#[test]
fn test_scheduler_config_rejects_bad_json() {
    let err = SchedulerConfig::from_json_str("{not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_scheduler_config_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"poll": {{"interval_secs": 42}}}}"#).unwrap();
    let cfg = SchedulerConfig::from_path(file.path()).unwrap();
    assert_eq!(cfg.poll.interval(), Duration::from_secs(42));
}

#[test]
fn test_scheduler_config_missing_file() {
    let err = SchedulerConfig::from_path("/nonexistent/scheduler.json").unwrap_err();
    assert!(err.contains("cannot read"));
}
