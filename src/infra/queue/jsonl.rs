//! File-backed event queue using JSON lines for durability.
//!
//! The file holds a watermark line followed by one line per live event.
//! Inserts are appended. Deletes write a fresh snapshot to a temporary file
//! next to the queue and rename it over the original, so the file on disk is
//! always either the old or the new snapshot. Identities keep increasing
//! across restarts because the watermark survives deletes.

use std::collections::BTreeMap;
use std::fs::{create_dir_all, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::StoreError;
use crate::eventengine::{Event, EventId, EventQueue, NewEvent, NEW_EVENT_CHANNEL};
use crate::infra::notify::NotificationHub;
use crate::util::now_ms;

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line {
    Watermark { next_id: EventId },
    Event(Event),
}

struct QueueState {
    next_id: EventId,
    events: BTreeMap<EventId, Event>,
}

/// Persistent event queue stored in a single JSONL file.
pub struct JsonlEventQueue {
    path: PathBuf,
    state: Mutex<QueueState>,
    notifications: Option<Arc<NotificationHub>>,
}

impl JsonlEventQueue {
    /// Open (or create) the queue file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            create_dir_all(dir)?;
        }
        let state = Self::load_from_disk(&path)?;
        tracing::debug!(
            path = %path.display(),
            "opened event queue with {} events, next id {}",
            state.events.len(),
            state.next_id
        );
        Ok(Self {
            path,
            state: Mutex::new(state),
            notifications: None,
        })
    }

    /// Publish on [`NEW_EVENT_CHANNEL`] through `hub` after every insert.
    #[must_use]
    pub fn with_notifications(mut self, hub: Arc<NotificationHub>) -> Self {
        self.notifications = Some(hub);
        self
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    fn load_from_disk(path: &Path) -> Result<QueueState, StoreError> {
        let mut state = QueueState {
            next_id: 1,
            events: BTreeMap::new(),
        };
        if !path.exists() {
            return Ok(state);
        }
        let file = OpenOptions::new().read(true).open(path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line)? {
                Line::Watermark { next_id } => state.next_id = state.next_id.max(next_id),
                Line::Event(event) => {
                    state.next_id = state.next_id.max(event.id + 1);
                    state.events.insert(event.id, event);
                }
            }
        }
        Ok(state)
    }

    fn append_to_disk(&self, event: &Event) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&Line::Event(event.clone()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn rewrite_disk(&self, state: &QueueState) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let snapshot = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(snapshot.as_file());
            let watermark = serde_json::to_string(&Line::Watermark {
                next_id: state.next_id,
            })?;
            writeln!(writer, "{watermark}")?;
            for event in state.events.values() {
                let line = serde_json::to_string(&Line::Event(event.clone()))?;
                writeln!(writer, "{line}")?;
            }
            writer.flush()?;
        }
        snapshot.as_file().sync_all()?;
        snapshot.persist(&self.path).map_err(|err| {
            tracing::error!(path = %self.path.display(), "cannot replace event queue file: {}", err.error);
            StoreError::Io(err.error)
        })?;
        Ok(())
    }
}

#[async_trait]
impl EventQueue for JsonlEventQueue {
    async fn insert(&self, event: NewEvent) -> Result<EventId, StoreError> {
        let id = {
            let mut state = self.state.lock();
            let id = state.next_id;
            let event = event.with_id(id, now_ms());
            self.append_to_disk(&event)?;
            state.next_id += 1;
            state.events.insert(id, event);
            id
        };
        if let Some(hub) = &self.notifications {
            hub.publish(NEW_EVENT_CHANNEL);
        }
        Ok(id)
    }

    async fn fetch_after(&self, target: &str, last_seen: EventId) -> Result<Vec<Event>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .events
            .range(last_seen.saturating_add(1)..)
            .map(|(_, event)| event)
            .filter(|event| event.target == target)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: EventId) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        let Some(removed) = state.events.remove(&id) else {
            return Ok(false);
        };
        if let Err(err) = self.rewrite_disk(&state) {
            state.events.insert(id, removed);
            return Err(err);
        }
        Ok(true)
    }
}
