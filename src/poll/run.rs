//! A single polling run against a single target.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use uuid::Uuid;

use crate::core::error::panic_message;
use crate::core::{PluginError, Registry};
use crate::poll::plugin::{Plugin, PluginType};
use crate::poll::target::NetworkTarget;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every plugin finished; `executed` is how many there were.
    Completed {
        /// Number of plugins executed.
        executed: usize,
    },
    /// A plugin failed and the rest of the chain was skipped.
    Aborted {
        /// Name of the failing plugin.
        plugin: String,
        /// Whether the plugin raised a recognized fatal error.
        fatal: bool,
    },
}

/// Bookkeeping for one in-flight, strictly sequential plugin chain.
pub struct RunContext<T: NetworkTarget> {
    id: Uuid,
    target: Arc<T>,
    plugins: Vec<Box<dyn Plugin>>,
    position: usize,
}

impl<T: NetworkTarget> RunContext<T> {
    /// Find and instantiate the plugins applicable to `target`, in order.
    pub fn new(target: Arc<T>, registry: &Registry<dyn PluginType<T>>) -> Self {
        let plugins: Vec<Box<dyn Plugin>> = registry
            .applicable(target.as_ref())
            .into_iter()
            .map(|kind| kind.build(&target))
            .collect();
        if plugins.is_empty() {
            tracing::warn!(target_name = target.display_name(), "no plugins for this run");
        } else {
            let names: Vec<&str> = plugins.iter().map(|p| p.name()).collect();
            tracing::debug!(
                target_name = target.display_name(),
                "plugins to call: {}",
                names.join(",")
            );
        }
        Self {
            id: Uuid::new_v4(),
            target,
            plugins,
            position: 0,
        }
    }

    /// Run identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The target being polled.
    #[must_use]
    pub const fn target(&self) -> &Arc<T> {
        &self.target
    }

    /// Names of the plugins in execution order.
    #[must_use]
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// Execute the plugin chain. Plugin `N + 1` starts only after plugin `N`
    /// has finished. The target's proxy is released exactly once however the
    /// run ends.
    pub async fn run(mut self) -> RunOutcome {
        let name = self.target.display_name().to_string();
        tracing::info!(target_name = %name, run_id = %self.id, "starting polling run");

        while self.position < self.plugins.len() {
            let plugin = &mut self.plugins[self.position];
            let plugin_name = plugin.name().to_string();
            tracing::debug!(target_name = %name, "now calling plugin: {plugin_name}");

            let outcome = AssertUnwindSafe(plugin.handle()).catch_unwind().await;
            let failure = match outcome {
                Ok(Ok(())) => {
                    self.position += 1;
                    continue;
                }
                Ok(Err(err)) => err,
                Err(panic) => PluginError::Other(anyhow::anyhow!(panic_message(panic.as_ref()))),
            };

            if failure.is_fatal() {
                tracing::error!(
                    target_name = %name,
                    "Aborting poll run due to error in plugin {plugin_name}: {failure}"
                );
            } else {
                tracing::error!(
                    target_name = %name,
                    "Aborting poll run due to unknown error in plugin {plugin_name}: {failure:?}"
                );
            }
            self.target.release_proxy();
            return RunOutcome::Aborted {
                plugin: plugin_name,
                fatal: failure.is_fatal(),
            };
        }

        self.target.release_proxy();
        tracing::info!(target_name = %name, run_id = %self.id, "polling run done");
        RunOutcome::Completed {
            executed: self.position,
        }
    }
}
