//! Configuration models for the event engine, poll scheduler and logging.

pub mod scheduler;

pub use scheduler::{EngineConfig, PollConfig, RetryConfig, SchedulerConfig, CONFIG_ENV};
