//! Indexed binary max-heap.
//!
//! Each key appears at most once. A key → slot map is kept in step with every
//! swap, so re-prioritising an existing key is a sift rather than a scan.
//! Use [`std::cmp::Reverse`] priorities for min-heap behaviour.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Debug)]
pub struct IndexedHeap<K, P> {
    heap: Vec<(K, P)>,
    index: HashMap<K, usize>,
}

impl<K, P> Default for IndexedHeap<K, P> {
    fn default() -> Self {
        Self {
            heap: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K, P> IndexedHeap<K, P>
where
    K: Hash + Eq + Clone,
    P: Ord,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn priority(&self, key: &K) -> Option<&P> {
        self.index.get(key).map(|&slot| &self.heap[slot].1)
    }

    /// Inserts `key`, or reprioritises it if already queued.
    ///
    /// Returns the previous priority when the key existed.
    pub fn push(&mut self, key: K, priority: P) -> Option<P> {
        if let Some(&slot) = self.index.get(&key) {
            let previous = std::mem::replace(&mut self.heap[slot].1, priority);
            let slot = self.sift_up(slot);
            self.sift_down(slot);
            return Some(previous);
        }
        let slot = self.heap.len();
        self.index.insert(key.clone(), slot);
        self.heap.push((key, priority));
        self.sift_up(slot);
        None
    }

    pub fn peek(&self) -> Option<(&K, &P)> {
        self.heap.first().map(|(k, p)| (k, p))
    }

    pub fn pop(&mut self) -> Option<(K, P)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let (key, priority) = self.heap.pop()?;
        self.index.remove(&key);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((key, priority))
    }

    pub fn remove(&mut self, key: &K) -> Option<P> {
        let slot = *self.index.get(key)?;
        let last = self.heap.len() - 1;
        self.swap(slot, last);
        let (removed, priority) = self.heap.pop()?;
        self.index.remove(&removed);
        if slot < self.heap.len() {
            let slot = self.sift_up(slot);
            self.sift_down(slot);
        }
        Some(priority)
    }

    /// Empties the heap, yielding entries from highest to lowest priority.
    pub fn drain(&mut self) -> Vec<(K, P)> {
        let mut drained = Vec::with_capacity(self.heap.len());
        while let Some(entry) = self.pop() {
            drained.push(entry);
        }
        drained
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.index.insert(self.heap[a].0.clone(), a);
        self.index.insert(self.heap[b].0.clone(), b);
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot].1 <= self.heap[parent].1 {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) -> usize {
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut largest = slot;
            if left < self.heap.len() && self.heap[left].1 > self.heap[largest].1 {
                largest = left;
            }
            if right < self.heap.len() && self.heap[right].1 > self.heap[largest].1 {
                largest = right;
            }
            if largest == slot {
                return slot;
            }
            self.swap(slot, largest);
            slot = largest;
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        assert_eq!(self.heap.len(), self.index.len());
        for (slot, (key, _)) in self.heap.iter().enumerate() {
            assert_eq!(self.index[key], slot);
            if slot > 0 {
                assert!(self.heap[(slot - 1) / 2].1 >= self.heap[slot].1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Reverse;

    use super::*;

    #[test]
    fn pops_in_priority_order() {
        let mut heap = IndexedHeap::new();
        for (key, priority) in [("a", 3), ("b", 9), ("c", 1), ("d", 7), ("e", 5)] {
            heap.push(key, priority);
            heap.assert_consistent();
        }
        let order: Vec<_> = heap.drain().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["b", "d", "e", "a", "c"]);
        assert!(heap.is_empty());
    }

    #[test]
    fn push_existing_key_reprioritises_instead_of_duplicating() {
        let mut heap = IndexedHeap::new();
        heap.push('x', Reverse(10));
        heap.push('y', Reverse(4));
        heap.push('z', Reverse(8));
        assert_eq!(heap.push('x', Reverse(1)), Some(Reverse(10)));
        heap.assert_consistent();
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.pop(), Some(('x', Reverse(1))));

        heap.push('y', Reverse(20));
        heap.assert_consistent();
        assert_eq!(heap.pop(), Some(('z', Reverse(8))));
        assert_eq!(heap.pop(), Some(('y', Reverse(20))));
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut heap = IndexedHeap::new();
        for key in 0..10u32 {
            heap.push(key, key * 3 % 7);
        }
        assert_eq!(heap.remove(&4), Some(5));
        assert_eq!(heap.remove(&4), None);
        heap.assert_consistent();
        assert!(!heap.contains(&4));
        assert_eq!(heap.priority(&6), Some(&4));
    }
}
