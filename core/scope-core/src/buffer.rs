//! Fixed-capacity, insertion-ordered live buffer.
//!
//! Used for the notification list, the rolling temperature trace, the log
//! sink and transient messages. Every push gets the next `arrival_order`;
//! once the buffer is full, each push evicts exactly one entry: the oldest.
//!
//! An entry may carry an expiry deadline. The deadline is stored in the entry
//! itself, so removing the entry (explicitly, by eviction or by `clear`)
//! also drops its pending expiry; nothing can fire against a removed entry.

use std::collections::VecDeque;
use std::time::Instant;

/// Monotonic arrival counter; doubles as the entry id.
pub type ArrivalOrder = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct BufferEntry<T> {
    pub arrival_order: ArrivalOrder,
    pub item: T,
    pub expires_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct BoundedLiveBuffer<T> {
    entries: VecDeque<BufferEntry<T>>,
    capacity: usize,
    next_order: ArrivalOrder,
}

impl<T> BoundedLiveBuffer<T> {
    /// Capacity is floored at 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            next_order: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: usize::MAX,
            next_order: 0,
        }
    }

    /// Appends an item. Returns its arrival order and the evicted entry, if
    /// the buffer was already full.
    pub fn push(&mut self, item: T) -> (ArrivalOrder, Option<BufferEntry<T>>) {
        self.push_entry(item, None)
    }

    /// Appends an item that [`expire_due`](Self::expire_due) removes once
    /// `deadline` has passed.
    pub fn push_expiring(
        &mut self,
        item: T,
        deadline: Instant,
    ) -> (ArrivalOrder, Option<BufferEntry<T>>) {
        self.push_entry(item, Some(deadline))
    }

    fn push_entry(
        &mut self,
        item: T,
        expires_at: Option<Instant>,
    ) -> (ArrivalOrder, Option<BufferEntry<T>>) {
        let arrival_order = self.next_order;
        self.next_order += 1;
        self.entries.push_back(BufferEntry {
            arrival_order,
            item,
            expires_at,
        });

        // Entries are kept sorted by arrival_order, so the front is oldest.
        let evicted = if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        (arrival_order, evicted)
    }

    /// Explicit removal (user dismissal). Does not affect future arrival
    /// orders.
    pub fn remove_by_id(&mut self, id: ArrivalOrder) -> Option<T> {
        let index = self
            .entries
            .binary_search_by_key(&id, |entry| entry.arrival_order)
            .ok()?;
        self.entries.remove(index).map(|entry| entry.item)
    }

    /// Removes every entry whose deadline is at or before `now`.
    pub fn expire_due(&mut self, now: Instant) -> Vec<BufferEntry<T>> {
        let mut expired = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match entry.expires_at {
                Some(deadline) if deadline <= now => expired.push(entry),
                _ => kept.push_back(entry),
            }
        }
        self.entries = kept;
        expired
    }

    /// Earliest pending deadline, for scheduling the next expiry check.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().filter_map(|entry| entry.expires_at).min()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn get(&self, id: ArrivalOrder) -> Option<&T> {
        self.entries
            .binary_search_by_key(&id, |entry| entry.arrival_order)
            .ok()
            .map(|index| &self.entries[index].item)
    }

    /// Oldest → newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BufferEntry<T>> + '_ {
        self.entries.iter()
    }

    pub fn items(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.entries.iter().map(|entry| &entry.item)
    }

    pub fn latest(&self) -> Option<&BufferEntry<T>> {
        self.entries.back()
    }

    /// Arrival order the next push will receive.
    pub fn next_arrival_order(&self) -> ArrivalOrder {
        self.next_order
    }
}
