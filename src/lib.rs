//! # Plugin Scheduler
//!
//! A single-threaded, plugin-dispatching task scheduler for network
//! management daemons, in two shapes built on the same core.
//!
//! ## Core
//!
//! - **Delay queue**: tasks ordered by fire time, then priority, then
//!   insertion order, each cancellable through its handle.
//! - **Task runner**: fires due tasks on the control thread and isolates
//!   their failures. Only a fatal error stops it.
//! - **Waiter**: sleeps until the next deadline, returning early when the
//!   store pushes a notification. A broken notification channel is
//!   resubscribed with bounded retry.
//! - **Registry**: an explicit list of handler or plugin types, filtered by
//!   `can_handle` and sorted by order key.
//!
//! ## Event engine
//!
//! Drains a persistent event queue at a fixed interval and on every insert
//! notification, giving each new event to the handlers that can handle it.
//! Events nobody claims become generic alerts.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plugin_scheduler::builders::build_event_engine;
//! use plugin_scheduler::config::SchedulerConfig;
//! use plugin_scheduler::core::SchedulerHandle;
//! use plugin_scheduler::eventengine::{InMemoryAlertSink, NEW_EVENT_CHANNEL};
//! use plugin_scheduler::infra::{InMemoryEventQueue, NotificationHub};
//! use plugin_scheduler::runtime::{exit_with, ControlThread};
//!
//! let cfg = SchedulerConfig::load()?;
//! let hub = Arc::new(NotificationHub::new(NEW_EVENT_CHANNEL));
//! let queue = Arc::new(InMemoryEventQueue::new().with_notifications(hub.clone()));
//! let engine = build_event_engine(&cfg, queue, Arc::new(InMemoryAlertSink::new(1000)), my_handlers(), SchedulerHandle::new())?;
//! exit_with(ControlThread::new()?.run_engine(&engine, hub));
//! ```
//!
//! ## Poll scheduler
//!
//! Runs an ordered chain of plugins against each network target, at most
//! one run per target key at a time, rescheduling each target a fixed
//! interval after its previous run ends.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: delay queue, runner, waiter and registry.
pub mod core;
/// Configuration models for the engine, poll scheduler and logging.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// Event queue engine.
pub mod eventengine;
/// Per-target poll scheduler.
pub mod poll;
/// Infrastructure adapters for event queues and notifications.
pub mod infra;
/// Control thread runtime and exit handling.
pub mod runtime;
/// Shared utilities.
pub mod util;
