//! Binary-heap scheduler backend with lazy deletion.
//!
//! Cancellations and re-plans leave stale slots in the heap; a live map
//! from item to its current key identifies them, and stale slots are
//! discarded whenever they surface at the top.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use super::{EventKey, Scheduler};

struct Slot<T> {
    key: EventKey,
    item: T,
}

impl<T> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Slot<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// A min-heap of event slots with deferred removal.
pub struct BinaryHeapScheduler<T> {
    heap: BinaryHeap<Reverse<Slot<T>>>,
    live: HashMap<T, EventKey>,
}

impl<T: Clone + Eq + Hash> BinaryHeapScheduler<T> {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        BinaryHeapScheduler {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
        }
    }

    fn is_live(&self, slot: &Slot<T>) -> bool {
        self.live.get(&slot.item) == Some(&slot.key)
    }

    /// Pops stale slots off the top until a live one (or nothing) remains.
    fn purge_top(&mut self) {
        while let Some(Reverse(slot)) = self.heap.peek() {
            if self.live.get(&slot.item) == Some(&slot.key) {
                return;
            }
            self.heap.pop();
        }
    }
}

impl<T: Clone + Eq + Hash> Default for BinaryHeapScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> Scheduler<T> for BinaryHeapScheduler<T> {
    fn schedule(&mut self, item: T, key: EventKey) {
        debug_assert!(!self.live.contains_key(&item));
        self.live.insert(item.clone(), key.clone());
        self.heap.push(Reverse(Slot { key, item }));
    }

    fn unschedule(&mut self, item: &T) -> Option<EventKey> {
        // The heap slot becomes stale and is skipped when it surfaces.
        self.live.remove(item)
    }

    fn key_of(&self, item: &T) -> Option<&EventKey> {
        self.live.get(item)
    }

    fn peek_key(&mut self) -> Option<&EventKey> {
        self.purge_top();
        let item = self.heap.peek().map(|Reverse(slot)| slot.item.clone())?;
        self.live.get(&item)
    }

    fn pop_imminent(&mut self) -> Vec<T> {
        self.purge_top();
        let deadline = match self.heap.peek() {
            Some(Reverse(slot)) => slot.key.deadline.clone(),
            None => return Vec::new(),
        };
        let mut imminent = Vec::new();
        while let Some(Reverse(slot)) = self.heap.peek() {
            if !self.is_live(slot) {
                self.heap.pop();
                continue;
            }
            if slot.key.deadline != deadline {
                break;
            }
            let Reverse(slot) = self.heap.pop().unwrap();
            self.live.remove(&slot.item);
            imminent.push(slot.item);
        }
        imminent
    }

    fn len(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Scale;
    use crate::time_point::TimePoint;

    fn key(at: i64, seq: u64) -> EventKey {
        EventKey {
            deadline: TimePoint::new(at, Scale::BASE),
            precision: Scale::BASE,
            seq,
        }
    }

    #[test]
    fn test_stale_slots_are_skipped() {
        let mut s: BinaryHeapScheduler<u32> = BinaryHeapScheduler::new();
        s.schedule(1, key(10, 0));
        s.schedule(2, key(20, 1));
        assert!(s.unschedule(&1).is_some());
        assert_eq!(s.len(), 1);
        assert_eq!(s.peek_key().unwrap().deadline, TimePoint::new(20, Scale::BASE));
        assert_eq!(s.pop_imminent(), vec![2]);
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn test_reschedule_uses_newest_key() {
        let mut s: BinaryHeapScheduler<u32> = BinaryHeapScheduler::new();
        s.schedule(1, key(10, 0));
        s.unschedule(&1);
        s.schedule(1, key(30, 1));
        s.schedule(2, key(20, 2));
        assert_eq!(s.pop_imminent(), vec![2]);
        assert_eq!(s.pop_imminent(), vec![1]);
    }
}
