//! Alert collaborator used when no handler claims an event.
//!
//! Provides the alert model, the sink abstraction and an in-memory sink with
//! bounded history and stateful duplicate suppression.

use std::collections::{BTreeMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::StoreError;
use crate::eventengine::event::{Event, EventId, EventState};
use crate::util::clock::now_ms;

/// Payload key overriding the generated alert type.
pub const ALERT_TYPE_VAR: &str = "alerttype";

/// A generic alert synthesized from an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Source event identity.
    pub event_id: EventId,
    /// Source event type.
    pub event_type: String,
    /// Alert type override taken from the event payload.
    pub alert_type: Option<String>,
    /// Device the alert concerns.
    pub netbox: Option<String>,
    /// Sub-component the alert concerns.
    pub subid: String,
    /// Stateful/stateless marker.
    pub state: EventState,
    /// Severity value.
    pub severity: i32,
    /// Payload copied from the event.
    pub varmap: BTreeMap<String, String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl Alert {
    /// Build an alert from an event.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        Self {
            event_id: event.id,
            event_type: event.event_type.clone(),
            alert_type: event.varmap.get(ALERT_TYPE_VAR).cloned(),
            netbox: event.netbox.clone(),
            subid: event.subid.clone(),
            state: event.state,
            severity: event.severity,
            varmap: event.varmap.clone(),
            created_at_ms: now_ms(),
        }
    }

    fn state_key(&self) -> (Option<String>, String, String) {
        (self.netbox.clone(), self.subid.clone(), self.event_type.clone())
    }
}

/// Alert posting collaborator.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Post an alert.
    async fn post(&self, alert: Alert) -> Result<(), StoreError>;

    /// Whether a stateful alert repeats the currently known state.
    async fn is_duplicate(&self, alert: &Alert) -> Result<bool, StoreError>;
}

struct SinkState {
    history: VecDeque<Alert>,
    open: HashSet<(Option<String>, String, String)>,
}

/// In-memory alert sink for testing and dev.
///
/// A `Start` alert is a duplicate while the same (netbox, subid, type) state
/// is open; an `End` alert is a duplicate when no such state is open.
pub struct InMemoryAlertSink {
    state: Mutex<SinkState>,
    max_alerts: usize,
}

impl InMemoryAlertSink {
    /// Create a new in-memory sink with a bounded history.
    #[must_use]
    pub fn new(max_alerts: usize) -> Self {
        Self {
            state: Mutex::new(SinkState {
                history: VecDeque::with_capacity(max_alerts.min(1024)),
                open: HashSet::new(),
            }),
            max_alerts,
        }
    }

    /// Retrieve a snapshot of posted alerts, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.state.lock().history.iter().cloned().collect()
    }

    /// Number of currently open stateful alerts.
    #[must_use]
    pub fn open_states(&self) -> usize {
        self.state.lock().open.len()
    }
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn post(&self, alert: Alert) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        match alert.state {
            EventState::Start => {
                state.open.insert(alert.state_key());
            }
            EventState::End => {
                state.open.remove(&alert.state_key());
            }
            EventState::Stateless => {}
        }
        if state.history.len() >= self.max_alerts {
            state.history.pop_front();
        }
        state.history.push_back(alert);
        Ok(())
    }

    async fn is_duplicate(&self, alert: &Alert) -> Result<bool, StoreError> {
        let state = self.state.lock();
        let open = state.open.contains(&alert.state_key());
        Ok(match alert.state {
            EventState::Start => open,
            EventState::End => !open,
            EventState::Stateless => false,
        })
    }
}
