//! Bounded content cache with single-flight coalescing.
//!
//! Rendered DNG blobs are kept in a process-wide, byte-bounded LRU shared
//! by every mount. The cache also coordinates concurrent readers of the
//! same entry: the first miss marks the key in-progress and obligates the
//! caller to eventually [`put`](ContentCache::put) or
//! [`mark_load_failed`](ContentCache::mark_load_failed); later readers
//! wait on that mark (bounded by a timeout) instead of rendering the same
//! frame twice.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::entry::Entry;

/// How long a reader waits for an in-progress peer before treating the
/// lookup as a miss.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// A cached artifact, shared by reference between the cache and readers.
pub type CacheItem = Arc<Vec<u8>>;

struct Slot {
    data: CacheItem,
    last_used: u64,
}

struct CacheState {
    items: HashMap<Entry, Slot>,
    in_progress: HashSet<Entry>,
    current_bytes: usize,
    tick: u64,
}

impl CacheState {
    fn touch(&mut self, key: &Entry) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(slot) = self.items.get_mut(key) {
            slot.last_used = tick;
        }
    }
}

/// Byte-bounded LRU cache keyed by [`Entry`].
pub struct ContentCache {
    state: Mutex<CacheState>,
    in_progress_changed: Condvar,
    capacity: usize,
}

impl ContentCache {
    /// Create a cache bounded to `capacity` bytes of item data.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                items: HashMap::new(),
                in_progress: HashSet::new(),
                current_bytes: 0,
                tick: 0,
            }),
            in_progress_changed: Condvar::new(),
            capacity,
        }
    }

    /// Look up `key`, waiting up to `wait_timeout` for an in-progress peer.
    ///
    /// Returns a shared handle on a hit. On a miss the key is marked
    /// in-progress and the caller now owns the build obligation: it must
    /// eventually call [`put`](Self::put) or
    /// [`mark_load_failed`](Self::mark_load_failed) for this key. A timed
    /// out wait is reported as a miss without taking the mark, so the
    /// caller may render but cannot block the slot again.
    pub fn get(&self, key: &Entry, wait_timeout: Duration) -> Option<CacheItem> {
        let mut state = self.state.lock().unwrap();

        if state.in_progress.contains(key) {
            let deadline = Instant::now() + wait_timeout;

            while state.in_progress.contains(key) {
                let now = Instant::now();
                if now >= deadline {
                    warn!(entry = %key.name, "timed out waiting for in-progress peer");
                    return None;
                }

                let (next, _) = self
                    .in_progress_changed
                    .wait_timeout(state, deadline - now)
                    .unwrap();
                state = next;
            }
        }

        if state.items.contains_key(key) {
            state.touch(key);
            return state.items.get(key).map(|slot| slot.data.clone());
        }

        state.in_progress.insert(key.clone());
        None
    }

    /// Insert or refresh `key`, evicting cold items to stay within
    /// capacity, then release the in-progress mark and wake waiters.
    ///
    /// An item larger than the whole cache is not inserted; the mark is
    /// still released.
    pub fn put(&self, key: &Entry, item: CacheItem) {
        let item_size = item.len();
        let mut state = self.state.lock().unwrap();

        state.in_progress.remove(key);

        if let Some(slot) = state.items.get_mut(key) {
            let old_size = slot.data.len();
            slot.data = item;
            state.current_bytes = state.current_bytes - old_size + item_size;
            state.touch(key);
        } else if item_size > self.capacity {
            warn!(
                entry = %key.name,
                size = item_size,
                capacity = self.capacity,
                "item larger than cache, not caching"
            );
        } else {
            while state.current_bytes + item_size > self.capacity {
                let coldest = state
                    .items
                    .iter()
                    .min_by_key(|(_, slot)| slot.last_used)
                    .map(|(entry, _)| entry.clone());

                match coldest {
                    Some(entry) => {
                        if let Some(slot) = state.items.remove(&entry) {
                            state.current_bytes -= slot.data.len();
                        }
                    }
                    None => break,
                }
            }

            state.tick += 1;
            let tick = state.tick;
            state.items.insert(
                key.clone(),
                Slot {
                    data: item,
                    last_used: tick,
                },
            );
            state.current_bytes += item_size;

            debug!(bytes = state.current_bytes, "cache size updated");
        }

        drop(state);
        self.in_progress_changed.notify_all();
    }

    /// Release a build obligation without storing anything.
    pub fn mark_load_failed(&self, key: &Entry) {
        let mut state = self.state.lock().unwrap();
        state.in_progress.remove(key);
        drop(state);
        self.in_progress_changed.notify_all();
    }

    /// Drop `key` from the cache, releasing any in-progress mark on it.
    pub fn remove(&self, key: &Entry) {
        let mut state = self.state.lock().unwrap();
        if let Some(slot) = state.items.remove(key) {
            state.current_bytes -= slot.data.len();
        }
        state.in_progress.remove(key);
        drop(state);
        self.in_progress_changed.notify_all();
    }

    /// Drop everything and wake all waiters.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.items.clear();
        state.in_progress.clear();
        state.current_bytes = 0;
        drop(state);
        self.in_progress_changed.notify_all();
    }

    /// Current size of held items in bytes.
    pub fn size(&self) -> usize {
        self.state.lock().unwrap().current_bytes
    }

    /// Configured capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident items.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn in_progress_count(&self) -> usize {
        self.state.lock().unwrap().in_progress.len()
    }
}
