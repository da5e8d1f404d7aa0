//! Logs IP/MAC address pairings from routers.
//!
//! Mappings are collected from the standard IP-MIB table first. When that
//! yields no IPv6 mappings the IPv6-MIB table is tried, and when there are
//! still none (or nothing at all) the vendor table is tried. The collected
//! set is compared with the open records for the device: unseen pairs are
//! opened, vanished pairs are expired.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Capability, PluginError, StoreError};
use crate::poll::plugin::{Plugin, PluginType};
use crate::poll::prefix_cache::{PrefixCache, PrefixId, PrefixSource};
use crate::poll::target::{Category, Netbox};

/// Record identity of an open ARP entry.
pub type ArpId = i64;

/// One row of an address-to-media table: (ifindex, ip, mac).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mapping {
    /// Interface index the mapping was seen on.
    pub ifindex: u32,
    /// Network address.
    pub ip: IpAddr,
    /// Hardware address, lowercase colon separated. May be empty.
    pub mac: String,
}

/// Reads an address-to-media table from a device.
#[async_trait]
pub trait MappingSource: Send + Sync {
    /// Name used in logs, e.g. `IP-MIB`.
    fn name(&self) -> &'static str;

    /// All mappings the device reports in this table.
    async fn mappings(&self, netbox: &Netbox) -> Result<Vec<Mapping>, StoreError>;
}

/// A newly discovered mapping to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArp {
    /// Network address.
    pub ip: IpAddr,
    /// Hardware address.
    pub mac: String,
    /// Most specific known prefix containing `ip`.
    pub prefix_id: Option<PrefixId>,
}

/// Changes to apply to a device's ARP records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArpUpdate {
    /// Mappings to open.
    pub new: Vec<NewArp>,
    /// Open records to expire.
    pub expired: Vec<ArpId>,
}

/// Persistence collaborator for ARP records.
#[async_trait]
pub trait ArpStore: Send + Sync {
    /// Currently open records for the device, keyed by (ip, mac).
    async fn open_mappings(&self, netbox: &Netbox) -> Result<HashMap<(IpAddr, String), ArpId>, StoreError>;

    /// Apply an update for the device.
    async fn apply(&self, netbox: &Netbox, update: ArpUpdate) -> Result<(), StoreError>;
}

/// Collaborators shared by all ARP plugin instances of one scheduler.
#[derive(Clone)]
pub struct ArpPluginType {
    prefix_cache: Arc<PrefixCache>,
    prefixes: Arc<dyn PrefixSource>,
    ip_mib: Arc<dyn MappingSource>,
    ipv6_mib: Arc<dyn MappingSource>,
    vendor_mib: Arc<dyn MappingSource>,
    store: Arc<dyn ArpStore>,
}

impl ArpPluginType {
    /// Create the plugin type.
    pub fn new(
        prefix_cache: Arc<PrefixCache>,
        prefixes: Arc<dyn PrefixSource>,
        ip_mib: Arc<dyn MappingSource>,
        ipv6_mib: Arc<dyn MappingSource>,
        vendor_mib: Arc<dyn MappingSource>,
        store: Arc<dyn ArpStore>,
    ) -> Self {
        Self {
            prefix_cache,
            prefixes,
            ip_mib,
            ipv6_mib,
            vendor_mib,
            store,
        }
    }
}

impl Capability<Netbox> for ArpPluginType {
    fn name(&self) -> &'static str {
        "Arp"
    }

    /// Only useful on layer 3 devices.
    fn can_handle(&self, netbox: &Netbox) -> bool {
        matches!(netbox.category, Category::Gw | Category::Gsw)
    }
}

impl PluginType<Netbox> for ArpPluginType {
    fn build(&self, target: &Arc<Netbox>) -> Box<dyn Plugin> {
        Box::new(ArpPlugin {
            kind: self.clone(),
            netbox: Arc::clone(target),
        })
    }
}

/// ARP collection against one device.
pub struct ArpPlugin {
    kind: ArpPluginType,
    netbox: Arc<Netbox>,
}

impl ArpPlugin {
    async fn collect(&self) -> Result<HashSet<Mapping>, StoreError> {
        let netbox = self.netbox.as_ref();
        let mut mappings: HashSet<Mapping> = self.kind.ip_mib.mappings(netbox).await?.into_iter().collect();
        tracing::debug!("found {} mappings in {}", mappings.len(), self.kind.ip_mib.name());

        if !has_ipv6(&mappings) {
            let found = self.kind.ipv6_mib.mappings(netbox).await?;
            tracing::debug!("found {} mappings in {}", found.len(), self.kind.ipv6_mib.name());
            mappings.extend(found);
        }

        if mappings.is_empty() || !has_ipv6(&mappings) {
            let found = self.kind.vendor_mib.mappings(netbox).await?;
            tracing::debug!("found {} mappings in {}", found.len(), self.kind.vendor_mib.name());
            mappings.extend(found);
        }
        Ok(mappings)
    }
}

#[async_trait]
impl Plugin for ArpPlugin {
    fn name(&self) -> &str {
        "Arp"
    }

    async fn handle(&mut self) -> Result<(), PluginError> {
        self.kind
            .prefix_cache
            .refresh_if_stale(self.kind.prefixes.as_ref())
            .await?;

        tracing::debug!(target_name = %self.netbox.sysname, "collecting IP/MAC mappings");
        let collected = self.collect().await?;
        let found: HashSet<(IpAddr, String)> = collected
            .into_iter()
            .filter(|m| !m.mac.is_empty())
            .map(|m| (m.ip, m.mac))
            .collect();

        let open = self.kind.store.open_mappings(&self.netbox).await?;
        let update = diff_mappings(&found, &open, &self.kind.prefix_cache);
        tracing::debug!(
            "mappings: {} new / {} expired / {} kept",
            update.new.len(),
            update.expired.len(),
            open.len() - update.expired.len()
        );
        self.kind.store.apply(&self.netbox, update).await?;
        Ok(())
    }
}

fn has_ipv6(mappings: &HashSet<Mapping>) -> bool {
    mappings.iter().any(|m| m.ip.is_ipv6())
}

/// Compare collected pairs with open records.
#[must_use]
pub fn diff_mappings(
    found: &HashSet<(IpAddr, String)>,
    open: &HashMap<(IpAddr, String), ArpId>,
    prefixes: &PrefixCache,
) -> ArpUpdate {
    let mut new: Vec<NewArp> = found
        .iter()
        .filter(|pair| !open.contains_key(*pair))
        .map(|(ip, mac)| NewArp {
            ip: *ip,
            mac: mac.clone(),
            prefix_id: prefixes.find_largest_matching(*ip),
        })
        .collect();
    new.sort_by(|a, b| (a.ip, &a.mac).cmp(&(b.ip, &b.mac)));

    let mut expired: Vec<ArpId> = open
        .iter()
        .filter(|(pair, _)| !found.contains(*pair))
        .map(|(_, id)| *id)
        .collect();
    expired.sort_unstable();

    ArpUpdate { new, expired }
}
