//! Event queue backends.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlEventQueue;
pub use memory::InMemoryEventQueue;
