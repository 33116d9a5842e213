//! Handle table mapping engine [`ElementRef`]s to retained OS elements.
//!
//! The table is bounded: least-recently-used entries are evicted (and their
//! OS references released) once capacity is reached. An evicted handle reads
//! as gone, which the engine treats like a closed window and re-detects.

use std::num::NonZeroUsize;

use lru::LruCache;
use notimover_engine::ElementRef;

/// Default number of live handles.
pub const DEFAULT_HANDLE_CAPACITY: usize = 4096;

/// Bounded handle allocator.
pub struct HandleTable<T> {
    /// Next raw handle value; zero is never issued.
    next: u64,
    /// Live entries.
    map: LruCache<u64, T>,
}

impl<T: Clone> HandleTable<T> {
    /// Table holding at most `capacity` live handles.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            next: 1,
            map: LruCache::new(cap),
        }
    }

    /// Store `value` under a fresh handle.
    pub fn insert(&mut self, value: T) -> ElementRef {
        let raw = self.next;
        self.next += 1;
        self.map.put(raw, value);
        ElementRef::from_raw(raw)
    }

    /// Clone of the value behind `el`, marking it recently used.
    pub fn get(&mut self, el: ElementRef) -> Option<T> {
        self.map.get(&el.raw()).cloned()
    }

    /// Drop the value behind `el`.
    pub fn remove(&mut self, el: ElementRef) -> Option<T> {
        self.map.pop(&el.raw())
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no handles are live.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<T: Clone> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_nonzero() {
        let mut t = HandleTable::new(8);
        let a = t.insert("a");
        let b = t.insert("a");
        assert_ne!(a, b);
        assert_ne!(a.raw(), 0);
        assert_eq!(t.get(a), Some("a"));
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let mut t = HandleTable::new(2);
        let a = t.insert(1);
        let b = t.insert(2);
        assert_eq!(t.get(a), Some(1));
        let c = t.insert(3);
        assert_eq!(t.get(b), None);
        assert_eq!(t.get(a), Some(1));
        assert_eq!(t.get(c), Some(3));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn removed_handles_read_as_missing() {
        let mut t = HandleTable::new(4);
        let a = t.insert(7);
        assert_eq!(t.remove(a), Some(7));
        assert_eq!(t.get(a), None);
        assert!(t.is_empty());
    }
}
