//! In-process geocode cache with single-flight slots.
//!
//! Every normalised address maps to one shared [`Slot`]. The first caller
//! for an address initialises the slot with the provider outcome; callers
//! that arrive while that lookup is in flight wait on the same slot instead
//! of issuing their own request. Bounded caches evict the least recently
//! used resolved address. In-flight slots are never evicted, so a bounded
//! cache may briefly hold more than its capacity.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::GeocodedAddress;

/// Outcome of one provider lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The provider matched the address.
    Found(GeocodedAddress),
    /// The provider answered with no match.
    NotFound,
    /// The lookup failed (timeout, transport, or provider error). Failed
    /// slots are dropped once every waiter has seen them, so the next
    /// request retries.
    Failed,
}

/// Single-flight cell shared by every caller for one address.
pub type Slot = Arc<OnceCell<Resolution>>;

struct Entry {
    slot: Slot,
    last_used: u64,
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    tick: u64,
}

/// Address → [`Slot`] map.
pub struct GeocodeCache {
    capacity: Option<usize>,
    inner: Mutex<Inner>,
}

impl GeocodeCache {
    /// Creates a cache holding at most `capacity` addresses, or an
    /// unbounded cache when `capacity` is `None`.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.map(|c| c.max(1)),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Returns the slot for `key`, creating an empty one if needed.
    pub fn slot(&self, key: &str) -> Slot {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.last_used = tick;
            return Arc::clone(&entry.slot);
        }

        let slot: Slot = Arc::new(OnceCell::new());
        inner.entries.insert(
            key.to_string(),
            Entry {
                slot: Arc::clone(&slot),
                last_used: tick,
            },
        );

        if let Some(capacity) = self.capacity {
            while inner.entries.len() > capacity {
                let Some(oldest) = inner
                    .entries
                    .iter()
                    .filter(|(k, e)| k.as_str() != key && e.slot.initialized())
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                log::debug!("Evicting geocode cache entry '{oldest}'");
                inner.entries.remove(&oldest);
            }
        }

        slot
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<Resolution> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(key)?.slot.get().cloned()
    }

    /// Drops `key` if it still maps to `slot`.
    pub fn forget(&self, key: &str, slot: &Slot) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner
            .entries
            .get(key)
            .is_some_and(|e| Arc::ptr_eq(&e.slot, slot))
        {
            inner.entries.remove(key);
        }
    }

    /// Number of cached addresses (including in-flight lookups).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_shares_a_slot() {
        let cache = GeocodeCache::new(None);
        let a = cache.slot("350 5th Ave");
        let b = cache.slot("350 5th Ave");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = GeocodeCache::new(Some(2));
        cache.slot("a").set(Resolution::NotFound).unwrap();
        cache.slot("b").set(Resolution::NotFound).unwrap();
        let _ = cache.slot("a");
        let _ = cache.slot("c");

        assert_eq!(cache.len(), 2);
        let inner = cache.inner.lock().unwrap();
        assert!(inner.entries.contains_key("a"));
        assert!(inner.entries.contains_key("c"));
        assert!(!inner.entries.contains_key("b"));
    }

    #[test]
    fn in_flight_slots_are_not_evicted() {
        let cache = GeocodeCache::new(Some(1));
        let pending = cache.slot("a");
        let other = cache.slot("b");

        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&pending, &cache.slot("a")));

        other.set(Resolution::NotFound).unwrap();
        pending.set(Resolution::NotFound).unwrap();
        let _ = cache.slot("c");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn forget_only_removes_matching_slot() {
        let cache = GeocodeCache::new(None);
        let first = cache.slot("a");
        cache.forget("a", &first);
        assert!(cache.is_empty());

        let second = cache.slot("a");
        cache.forget("a", &first);
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&second, &cache.slot("a")));
    }

    #[test]
    fn get_returns_only_resolved_values() {
        let cache = GeocodeCache::new(None);
        let slot = cache.slot("a");
        assert_eq!(cache.get("a"), None);
        slot.set(Resolution::NotFound).unwrap();
        assert_eq!(cache.get("a"), Some(Resolution::NotFound));
    }
}
