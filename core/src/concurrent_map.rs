//! Striped-lock accumulator used by the parallel query path.
//!
//! Keys are hashed onto a fixed number of buckets, each behind its own
//! `parking_lot::Mutex`. Writers touching different buckets never wait on each
//! other; writers on the same bucket serialize.

use ahash::RandomState;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hash};

pub const DEFAULT_BUCKET_COUNT: usize = 77;

/// Scoped mutable access to one value. The bucket stays locked until the
/// guard is dropped, which also happens while unwinding.
pub type Access<'a, V> = MappedMutexGuard<'a, V>;

pub struct ConcurrentMap<K, V> {
    buckets: Vec<Mutex<BTreeMap<K, V>>>,
    hasher: RandomState,
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Ord + Hash,
    V: Default,
{
    pub fn new(bucket_count: usize) -> Self {
        assert!(bucket_count > 0, "ConcurrentMap needs at least one bucket");
        let buckets = (0..bucket_count).map(|_| Mutex::new(BTreeMap::new())).collect();
        Self { buckets, hasher: RandomState::new() }
    }

    pub fn bucket_count(&self) -> usize { self.buckets.len() }

    fn bucket_index(&self, key: &K) -> usize {
        (BuildHasher::hash_one(&self.hasher, key) % self.buckets.len() as u64) as usize
    }

    /// Lock the bucket owning `key` and hand out its value, inserting
    /// `V::default()` first if the key is new.
    pub fn access(&self, key: K) -> Access<'_, V> {
        let bucket = self.buckets[self.bucket_index(&key)].lock();
        MutexGuard::map(bucket, |entries| entries.entry(key).or_default())
    }

    pub fn erase(&self, key: &K) -> Option<V> {
        self.buckets[self.bucket_index(key)].lock().remove(key)
    }

    /// Copy every bucket into one ordered map.
    ///
    /// Buckets are locked one at a time in index order, so the result is not a
    /// snapshot: only call this once all writers are done.
    pub fn build_ordinary_map(&self) -> BTreeMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        let mut result = BTreeMap::new();
        for bucket in &self.buckets {
            let entries = bucket.lock();
            result.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        result
    }
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Ord + Hash,
    V: Default,
{
    fn default() -> Self { Self::new(DEFAULT_BUCKET_COUNT) }
}
