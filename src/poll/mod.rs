//! Per-target poll scheduler: ordered plugin chains run against network
//! targets, serialized per target key.

pub mod plugin;
pub mod plugins;
pub mod prefix_cache;
pub mod run;
pub mod schedule;
pub mod target;

pub use plugin::{Plugin, PluginType};
pub use prefix_cache::{PrefixCache, PrefixId, PrefixSource};
pub use run::{RunContext, RunOutcome};
pub use schedule::{PollAttempt, PollScheduler};
pub use target::{Category, Netbox, NetworkTarget};
