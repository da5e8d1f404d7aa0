//! Event queue engine: drains a persistent event queue and dispatches each
//! event to the handlers that can handle it.

pub mod alerts;
pub mod engine;
pub mod event;
pub mod handler;
pub mod queue;

pub use alerts::{Alert, AlertSink, InMemoryAlertSink};
pub use engine::EventEngine;
pub use event::{Event, EventId, EventState, NewEvent};
pub use handler::{EventContext, EventHandler, HandlerType, PLUGIN_TASKS_PRIORITY};
pub use queue::{EventQueue, NEW_EVENT_CHANNEL};
