use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicUsize, Ordering},
};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::CapacityError;

const SHARDS: usize = 64;

/// A concurrent hash table that never grows past a fixed number of entries.
///
/// Keys are spread over independent shards, each behind its own lock, so readers and writers of
/// different keys rarely touch the same lock and no operation ever takes more than one. A single
/// atomic counter enforces the capacity across shards.
///
/// Replacing the value of an existing key always succeeds. Inserting a new key fails with
/// [`CapacityError`] once `capacity` keys are present. There is no eviction.
pub struct BoundedMap<K, V> {
    shards: Box<[RwLock<FxHashMap<K, V>>]>,
    len: AtomicUsize,
    capacity: usize,
}

impl<K, V> BoundedMap<K, V>
where
    K: Eq + Hash,
    V: Copy,
{
    /// Creates an empty map admitting at most `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        let shards = (0..SHARDS).map(|_| RwLock::new(FxHashMap::default())).collect();
        Self { shards, len: AtomicUsize::new(0), capacity }
    }

    fn shard(&self, key: &K) -> &RwLock<FxHashMap<K, V>> {
        // The shard is picked with a different hasher than the one used inside the shard, so
        // the keys of one shard still spread over all of its buckets.
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Returns a copy of the value stored for `key`.
    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        self.shard(key).read().get(key).copied()
    }

    /// Inserts or replaces the value for `key`, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>, CapacityError> {
        let mut shard = self.shard(&key).write();

        if let Some(slot) = shard.get_mut(&key) {
            return Ok(Some(std::mem::replace(slot, value)));
        }

        self.len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| {
                (len < self.capacity).then_some(len + 1)
            })
            .map_err(|_| CapacityError { capacity: self.capacity })?;

        shard.insert(key, value);
        Ok(None)
    }

    /// Removes `key`, freeing its slot.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut shard = self.shard(key).write();
        let removed = shard.remove(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Number of entries currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> fmt::Debug for BoundedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedMap")
            .field("len", &self.len.load(Ordering::Relaxed))
            .field("capacity", &self.capacity)
            .finish()
    }
}
