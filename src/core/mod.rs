//! Core scheduling abstractions: delay queue, waiter, runner and registry.

pub mod delay_queue;
pub mod error;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod waiter;

pub use delay_queue::{DelayQueue, Next, TaskHandle};
pub use error::{AppResult, PluginError, SchedulerError, StoreError};
pub use registry::{Capability, Registry};
pub use retry::RetryPolicy;
pub use runner::{NotificationHook, SchedulerHandle, Task, TaskResult, TaskRunner};
pub use waiter::{Notification, NotificationSource, NotifyWaiter, SleepWaiter, WakeReason, Waiter};
