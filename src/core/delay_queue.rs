//! Delay queue ordered by fire time, then priority, then insertion order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use tokio::time::Instant;

/// Handle returned by [`DelayQueue::insert_at`], used to cancel a pending item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Raw sequence number, unique per queue.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

/// Result of asking the queue for the next due item.
#[derive(Debug)]
pub enum Next<T> {
    /// An item whose fire time has been reached.
    Due(T),
    /// Nothing is due yet; the earliest item fires after this duration.
    Wait(Duration),
    /// The queue holds no pending items.
    Idle,
}

/// Heap entry. Ordered so the max-heap yields the smallest
/// (fire time, priority, sequence) first.
struct Entry<T> {
    fire_at: Instant,
    priority: i32,
    seq: u64,
    item: T,
}

impl<T> Entry<T> {
    fn key(&self) -> (Instant, i32, u64) {
        (self.fire_at, self.priority, self.seq)
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: earliest key is the heap maximum.
        other.key().cmp(&self.key())
    }
}

/// Ordered store of not-yet-due items.
///
/// Cancellation leaves a tombstone in the heap which is discarded the next
/// time it reaches the top; cancelled items are never returned and are not
/// counted by [`DelayQueue::len`].
pub struct DelayQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    pending: HashSet<u64>,
    next_seq: u64,
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DelayQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Insert an item firing at an absolute instant.
    pub fn insert_at(&mut self, fire_at: Instant, priority: i32, item: T) -> TaskHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(seq);
        self.heap.push(Entry {
            fire_at,
            priority,
            seq,
            item,
        });
        TaskHandle(seq)
    }

    /// Insert an item firing `delay` after `now`.
    pub fn insert(&mut self, now: Instant, delay: Duration, priority: i32, item: T) -> TaskHandle {
        self.insert_at(now + delay, priority, item)
    }

    /// Cancel a pending item. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.pending.remove(&handle.0)
    }

    /// Pop the next item if due at `now`, otherwise report how long until it is.
    pub fn pop_due(&mut self, now: Instant) -> Next<T> {
        self.discard_cancelled();
        let Some(head) = self.heap.peek() else {
            return Next::Idle;
        };
        if head.fire_at > now {
            return Next::Wait(head.fire_at - now);
        }
        match self.heap.pop() {
            Some(entry) => {
                self.pending.remove(&entry.seq);
                Next::Due(entry.item)
            }
            None => Next::Idle,
        }
    }

    /// Fire time of the earliest pending item.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_cancelled();
        self.heap.peek().map(|e| e.fire_at)
    }

    /// Number of pending (not cancelled) items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no items are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending items in arbitrary order, with their fire times.
    pub fn iter_pending(&self) -> impl Iterator<Item = (Instant, &T)> + '_ {
        self.heap
            .iter()
            .filter(|e| self.pending.contains(&e.seq))
            .map(|e| (e.fire_at, &e.item))
    }

    fn discard_cancelled(&mut self) {
        while let Some(head) = self.heap.peek() {
            if self.pending.contains(&head.seq) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pop_all(q: &mut DelayQueue<&'static str>, now: Instant) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Next::Due(item) = q.pop_due(now) {
            out.push(item);
        }
        out
    }

    #[test]
    fn test_fires_in_time_order() {
        let now = Instant::now();
        let mut q = DelayQueue::new();
        q.insert(now, Duration::from_secs(3), 0, "c");
        q.insert(now, Duration::from_secs(1), 0, "a");
        q.insert(now, Duration::from_secs(2), 0, "b");

        assert_eq!(pop_all(&mut q, now + Duration::from_secs(5)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_priority_breaks_ties_then_insertion_order() {
        let now = Instant::now();
        let mut q = DelayQueue::new();
        q.insert(now, Duration::ZERO, 1, "low-first");
        q.insert(now, Duration::ZERO, 0, "high");
        q.insert(now, Duration::ZERO, 1, "low-second");

        assert_eq!(pop_all(&mut q, now), vec!["high", "low-first", "low-second"]);
    }

    #[test]
    fn test_never_fires_early() {
        let now = Instant::now();
        let mut q = DelayQueue::new();
        q.insert(now, Duration::from_secs(10), 0, "later");

        match q.pop_due(now + Duration::from_secs(4)) {
            Next::Wait(d) => assert_eq!(d, Duration::from_secs(6)),
            other => panic!("expected wait, got {other:?}"),
        }
        assert!(matches!(q.pop_due(now + Duration::from_secs(10)), Next::Due("later")));
        assert!(matches!(q.pop_due(now + Duration::from_secs(10)), Next::Idle));
    }

    #[test]
    fn test_cancelled_item_never_fires() {
        let now = Instant::now();
        let mut q = DelayQueue::new();
        let first = q.insert(now, Duration::ZERO, 0, "cancelled");
        q.insert(now, Duration::from_secs(1), 0, "kept");

        assert!(q.cancel(first));
        assert!(!q.cancel(first));
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(now + Duration::from_secs(1)));
        assert_eq!(pop_all(&mut q, now + Duration::from_secs(1)), vec!["kept"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let now = Instant::now();
        let mut q = DelayQueue::new();
        let handle = q.insert(now, Duration::ZERO, 0, "x");
        assert!(matches!(q.pop_due(now), Next::Due("x")));
        assert!(!q.cancel(handle));
    }

    #[test]
    fn test_iter_pending_skips_cancelled() {
        let now = Instant::now();
        let mut q = DelayQueue::new();
        let gone = q.insert(now, Duration::ZERO, 0, "gone");
        q.insert(now, Duration::ZERO, 0, "here");
        q.cancel(gone);

        let items: Vec<_> = q.iter_pending().map(|(_, item)| *item).collect();
        assert_eq!(items, vec!["here"]);
    }
}
