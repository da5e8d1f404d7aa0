//! Infrastructure adapters: event queue backends and the notification channel.

pub mod notify;
pub mod queue;

pub use notify::NotificationHub;
pub use queue::{InMemoryEventQueue, JsonlEventQueue};
