//! Shared prefix lookup table refreshed on a time-to-live.
//!
//! Owned explicitly by whoever builds the plugins that use it, so separate
//! scheduler instances never share one.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use ipnetwork::IpNetwork;
use parking_lot::RwLock;
use tokio::time::Instant;

use crate::core::StoreError;

/// Store identity of a prefix.
pub type PrefixId = i64;

/// Default time-to-live of the cached table.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Loads the full prefix table from the store.
#[async_trait]
pub trait PrefixSource: Send + Sync {
    /// All known prefixes with their identities.
    async fn load_prefixes(&self) -> Result<Vec<(IpNetwork, PrefixId)>, StoreError>;
}

struct CacheState {
    prefixes: Vec<(IpNetwork, PrefixId)>,
    updated_at: Option<Instant>,
}

/// Prefix table, ordered most specific first.
pub struct PrefixCache {
    state: RwLock<CacheState>,
    max_age: Duration,
}

impl Default for PrefixCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

impl PrefixCache {
    /// Create an empty cache that goes stale after `max_age`.
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState {
                prefixes: Vec::new(),
                updated_at: None,
            }),
            max_age,
        }
    }

    /// Whether the table was never loaded or is older than the max age.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.state
            .read()
            .updated_at
            .is_none_or(|at| at.elapsed() > self.max_age)
    }

    /// Number of cached prefixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().prefixes.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().prefixes.is_empty()
    }

    /// Replace the table contents.
    pub fn replace(&self, mut prefixes: Vec<(IpNetwork, PrefixId)>) {
        prefixes.sort_by(|a, b| b.0.prefix().cmp(&a.0.prefix()));
        tracing::debug!("populating prefix cache with {} prefixes", prefixes.len());
        let mut state = self.state.write();
        state.prefixes = prefixes;
        state.updated_at = Some(Instant::now());
    }

    /// Reload the table from `source` if it is stale. Returns whether a
    /// reload happened.
    pub async fn refresh_if_stale(&self, source: &dyn PrefixSource) -> Result<bool, StoreError> {
        if !self.is_stale() {
            return Ok(false);
        }
        // Mark fresh before loading so concurrent runs do not all reload.
        self.state.write().updated_at = Some(Instant::now());
        match source.load_prefixes().await {
            Ok(prefixes) => {
                self.replace(prefixes);
                Ok(true)
            }
            Err(err) => {
                self.state.write().updated_at = None;
                Err(err)
            }
        }
    }

    /// The most specific cached prefix containing `ip`.
    #[must_use]
    pub fn find_largest_matching(&self, ip: IpAddr) -> Option<PrefixId> {
        self.state
            .read()
            .prefixes
            .iter()
            .find(|(net, _)| net.contains(ip))
            .map(|(_, id)| *id)
    }
}
