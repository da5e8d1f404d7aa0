//! Capability registry: ordered, immutable set of handler/plugin types.

use std::sync::Arc;

/// A handler or plugin type that can decide whether it applies to an item.
pub trait Capability<I: ?Sized>: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this type can handle `item`. Must not perform I/O.
    fn can_handle(&self, item: &I) -> bool;

    /// Intrinsic ordering key; lower runs first.
    fn order_key(&self) -> i32 {
        0
    }
}

/// Registered types, in registration order.
pub struct Registry<C: ?Sized> {
    entries: Arc<[Arc<C>]>,
}

impl<C: ?Sized> Clone for Registry<C> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<C: ?Sized> Registry<C> {
    /// Build a registry from an explicit registration list.
    #[must_use]
    pub fn new(entries: Vec<Arc<C>>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered types in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<C>> {
        self.entries.iter()
    }

    /// Types applicable to `item`, sorted by order key with ties kept in
    /// registration order.
    pub fn applicable<I>(&self, item: &I) -> Vec<Arc<C>>
    where
        I: ?Sized,
        C: Capability<I>,
    {
        let mut matching: Vec<Arc<C>> = self
            .entries
            .iter()
            .filter(|entry| entry.can_handle(item))
            .cloned()
            .collect();
        matching.sort_by_key(|entry| entry.order_key());
        matching
    }
}

impl<C: ?Sized> FromIterator<Arc<C>> for Registry<C> {
    fn from_iter<T: IntoIterator<Item = Arc<C>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
