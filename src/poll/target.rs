//! Network targets polled by the poll scheduler.

use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// A device that poll runs are executed against.
pub trait NetworkTarget: Send + Sync + 'static {
    /// Mutual-exclusion key; at most one run per key is in flight.
    fn key(&self) -> String;

    /// Name used in log messages.
    fn display_name(&self) -> &str;

    /// Release the communication channel held for this target. Idempotent.
    fn release_proxy(&self);
}

/// Device category, used by plugins to decide applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Router.
    Gw,
    /// Routing switch.
    Gsw,
    /// Switch.
    Sw,
    /// Edge switch.
    Edge,
    /// Server.
    Srv,
    /// Anything else.
    Other,
}

/// A polled network device.
#[derive(Serialize, Deserialize)]
pub struct Netbox {
    /// Database identity.
    pub id: i64,
    /// System name.
    pub sysname: String,
    /// Management address; the scheduling key.
    pub ip: IpAddr,
    /// Device category.
    pub category: Category,
    #[serde(skip)]
    proxy_open: AtomicBool,
    #[serde(skip)]
    releases: AtomicUsize,
}

impl Netbox {
    /// Create a netbox.
    pub fn new(id: i64, sysname: impl Into<String>, ip: IpAddr, category: Category) -> Self {
        Self {
            id,
            sysname: sysname.into(),
            ip,
            category,
            proxy_open: AtomicBool::new(false),
            releases: AtomicUsize::new(0),
        }
    }

    /// Reserve the SNMP proxy for this device.
    pub fn open_proxy(&self) {
        self.proxy_open.store(true, Ordering::Release);
    }

    /// Whether the proxy is currently reserved.
    #[must_use]
    pub fn proxy_is_open(&self) -> bool {
        self.proxy_open.load(Ordering::Acquire)
    }

    /// Number of times the proxy was actually released.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Netbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Netbox")
            .field("id", &self.id)
            .field("sysname", &self.sysname)
            .field("ip", &self.ip)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl NetworkTarget for Netbox {
    fn key(&self) -> String {
        self.ip.to_string()
    }

    fn display_name(&self) -> &str {
        &self.sysname
    }

    fn release_proxy(&self) {
        if self.proxy_open.swap(false, Ordering::AcqRel) {
            self.releases.fetch_add(1, Ordering::AcqRel);
            tracing::trace!(target_name = %self.sysname, "released proxy");
        }
    }
}
