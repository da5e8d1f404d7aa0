//! Events consumed from the persistent event queue.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Queue-assigned event identity. Monotonically increasing, never reused.
pub type EventId = i64;

/// Whether an event starts or ends a state, or carries no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// One-off event.
    Stateless,
    /// Opens a stateful condition.
    Start,
    /// Closes a stateful condition.
    End,
}

impl EventState {
    /// Whether the event participates in start/end pairing.
    #[must_use]
    pub const fn is_stateful(self) -> bool {
        !matches!(self, Self::Stateless)
    }
}

/// An event posted for a named target process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Queue identity.
    pub id: EventId,
    /// Consumer name, e.g. `eventEngine`.
    pub target: String,
    /// Posting subsystem.
    pub source: String,
    /// Device the event concerns, if any.
    pub netbox: Option<String>,
    /// Sub-component (interface, module) the event concerns.
    pub subid: String,
    /// Event type, e.g. `boxState`, `linkState`.
    pub event_type: String,
    /// Stateful/stateless marker.
    pub state: EventState,
    /// Severity value passed through to alerts.
    pub severity: i32,
    /// Free-form payload.
    pub varmap: BTreeMap<String, String>,
    /// Insert time in milliseconds since epoch.
    pub created_at_ms: u128,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Event id={} type={} state={:?} netbox={}>",
            self.id,
            self.event_type,
            self.state,
            self.netbox.as_deref().unwrap_or("-")
        )
    }
}

/// An event before the queue has assigned it an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Consumer name.
    pub target: String,
    /// Posting subsystem.
    pub source: String,
    /// Device the event concerns, if any.
    pub netbox: Option<String>,
    /// Sub-component the event concerns.
    pub subid: String,
    /// Event type.
    pub event_type: String,
    /// Stateful/stateless marker.
    pub state: EventState,
    /// Severity value.
    pub severity: i32,
    /// Free-form payload.
    pub varmap: BTreeMap<String, String>,
}

impl NewEvent {
    /// Start building a stateless event of `event_type` for `target`.
    pub fn new(target: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: "ipdevpoll".into(),
            netbox: None,
            subid: String::new(),
            event_type: event_type.into(),
            state: EventState::Stateless,
            severity: 50,
            varmap: BTreeMap::new(),
        }
    }

    /// Set the device.
    #[must_use]
    pub fn netbox(mut self, netbox: impl Into<String>) -> Self {
        self.netbox = Some(netbox.into());
        self
    }

    /// Set the sub-component.
    #[must_use]
    pub fn subid(mut self, subid: impl Into<String>) -> Self {
        self.subid = subid.into();
        self
    }

    /// Set the state.
    #[must_use]
    pub const fn state(mut self, state: EventState) -> Self {
        self.state = state;
        self
    }

    /// Add a payload variable.
    #[must_use]
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.varmap.insert(key.into(), value.into());
        self
    }

    /// Attach an identity, producing a stored event.
    #[must_use]
    pub fn with_id(self, id: EventId, created_at_ms: u128) -> Event {
        Event {
            id,
            target: self.target,
            source: self.source,
            netbox: self.netbox,
            subid: self.subid,
            event_type: self.event_type,
            state: self.state,
            severity: self.severity,
            varmap: self.varmap,
            created_at_ms,
        }
    }
}
