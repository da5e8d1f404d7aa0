//! Tests for error types

use plugin_scheduler::core::{PluginError, SchedulerError, StoreError};

#[test]
fn test_connection_lost_error() {
    let err = StoreError::ConnectionLost("server closed the connection".to_string());
    assert_eq!(format!("{}", err), "connection lost: server closed the connection");
    assert!(err.is_connection_loss());
}

#[test]
fn test_query_error_is_not_connection_loss() {
    let err = StoreError::Query("syntax error".to_string());
    assert!(!err.is_connection_loss());
}

#[test]
fn test_fatal_plugin_error() {
    let err = PluginError::Fatal("SNMP agent unreachable".to_string());
    assert!(err.is_fatal());
    assert_eq!(format!("{}", err), "fatal plugin error: SNMP agent unreachable");
}

#[test]
fn test_store_error_converts_to_plugin_error() {
    let err: PluginError = StoreError::Query("bad".to_string()).into();
    assert!(!err.is_fatal());
    assert_eq!(format!("{}", err), "query failed: bad");
}

#[test]
fn test_anyhow_converts_to_plugin_error() {
    let err: PluginError = anyhow::anyhow!("unexpected").into();
    assert!(!err.is_fatal());
}

#[test]
fn test_only_fatal_scheduler_error_is_fatal() {
    assert!(SchedulerError::Fatal("db".to_string()).is_fatal());
    assert!(!SchedulerError::Task("oops".to_string()).is_fatal());
    assert!(!SchedulerError::Config("bad".to_string()).is_fatal());
    let store: SchedulerError = StoreError::Query("x".to_string()).into();
    assert!(!store.is_fatal());
    assert_eq!(format!("{}", store), "store error: query failed: x");
}
