//! Built-in poll plugins.

pub mod arp;

pub use arp::{ArpPlugin, ArpPluginType, ArpStore, ArpUpdate, Mapping, MappingSource, NewArp};
