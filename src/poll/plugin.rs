//! Poll plugins.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Capability, PluginError};

/// A plugin instance, built for one run against one target.
#[async_trait]
pub trait Plugin: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Collect from the target. Returning [`PluginError::Fatal`] or any
    /// other error aborts the rest of the run.
    async fn handle(&mut self) -> Result<(), PluginError>;
}

/// A registered plugin type for targets of type `T`.
pub trait PluginType<T>: Capability<T> {
    /// Construct a plugin for `target`. Must not perform I/O.
    fn build(&self, target: &Arc<T>) -> Box<dyn Plugin>;
}
