//! Builders to construct the event engine and poll scheduler from configuration.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{Registry, SchedulerError, SchedulerHandle};
use crate::eventengine::{AlertSink, EventEngine, EventQueue, HandlerType};
use crate::poll::{NetworkTarget, PluginType, PollScheduler};

/// Build an event engine scheduling its work on `scheduler`.
///
/// `handlers` is the explicit registration list; order does not matter,
/// dispatch order comes from each handler's order key.
pub fn build_event_engine(
    cfg: &SchedulerConfig,
    queue: Arc<dyn EventQueue>,
    alerts: Arc<dyn AlertSink>,
    handlers: Vec<Arc<dyn HandlerType>>,
    scheduler: SchedulerHandle,
) -> Result<Arc<EventEngine>, SchedulerError> {
    cfg.engine
        .validate()
        .map_err(|e| SchedulerError::Config(format!("engine invalid: {e}")))?;
    Ok(EventEngine::new(
        &cfg.engine,
        queue,
        alerts,
        Registry::new(handlers),
        scheduler,
    ))
}

/// Build a poll scheduler driving runs on `scheduler`.
pub fn build_poll_scheduler<T: NetworkTarget>(
    cfg: &SchedulerConfig,
    scheduler: SchedulerHandle,
    plugins: Vec<Arc<dyn PluginType<T>>>,
) -> Result<PollScheduler<T>, SchedulerError> {
    cfg.poll
        .validate()
        .map_err(|e| SchedulerError::Config(format!("poll invalid: {e}")))?;
    tracing::debug!("poll scheduler with {} plugin types", plugins.len());
    Ok(PollScheduler::new(
        scheduler,
        Registry::new(plugins),
        cfg.poll.interval(),
    ))
}
