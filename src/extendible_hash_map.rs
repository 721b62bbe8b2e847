//! ExtendibleHashMap: public API over the extendible table.

use crate::directory::{HASH_BITS, MIN_GLOBAL_DEPTH};
use crate::error::Error;
use crate::hasher::{DefaultKeyHasher, KeyHasher};
use crate::reentrancy::DebugReentrancy;
use crate::table::{ExtendibleTable, Iter};
use core::borrow::Borrow;
use core::fmt;

/// Bucket capacity used by [`ExtendibleHashMap::new`].
pub const DEFAULT_BUCKET_CAPACITY: usize = 4;

/// Largest directory depth accepted at construction (65 536 slots). Growth
/// past it happens on demand, up to [`HASH_BITS`].
pub const MAX_INITIAL_GLOBAL_DEPTH: u8 = 16;

/// A map indexed by an extendible-hashing directory.
///
/// The directory holds `2^global_depth` slots addressed by the low bits of a
/// key's 32-bit hash; each slot points at a bucket of at most
/// `bucket_capacity` entries, and neighbouring slots share a bucket until it
/// fills up. A full bucket splits in two (doubling the directory only when
/// the bucket already uses every directory bit); a bucket emptied by removal
/// merges back with its buddy and the directory halves once its upper half
/// mirrors the lower one. No operation ever rehashes the whole map.
///
/// The map is `Send` but not `Sync`; share it behind a `Mutex`.
pub struct ExtendibleHashMap<K, V, H = DefaultKeyHasher> {
    hasher: H,
    table: ExtendibleTable<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> ExtendibleHashMap<K, V> {
    /// Empty map with [`DEFAULT_BUCKET_CAPACITY`] and the default hasher.
    pub fn new() -> Self {
        Self::from_parts(
            DEFAULT_BUCKET_CAPACITY,
            MIN_GLOBAL_DEPTH,
            DefaultKeyHasher::default(),
        )
    }

    pub fn with_bucket_capacity(bucket_capacity: usize) -> Result<Self, Error> {
        Self::with_hasher(bucket_capacity, DefaultKeyHasher::default())
    }
}

impl<K, V> Default for ExtendibleHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> ExtendibleHashMap<K, V, H> {
    pub fn with_hasher(bucket_capacity: usize, hasher: H) -> Result<Self, Error> {
        Self::with_depth_and_hasher(bucket_capacity, MIN_GLOBAL_DEPTH, hasher)
    }

    /// Starts with `2^global_depth` buckets instead of two. Useful when the
    /// eventual size is known; the directory may still collapse below this.
    pub fn with_depth_and_hasher(
        bucket_capacity: usize,
        global_depth: u8,
        hasher: H,
    ) -> Result<Self, Error> {
        if bucket_capacity == 0 {
            return Err(Error::ZeroBucketCapacity);
        }
        if !(MIN_GLOBAL_DEPTH..=MAX_INITIAL_GLOBAL_DEPTH).contains(&global_depth) {
            return Err(Error::InvalidGlobalDepth {
                requested: global_depth,
                max: MAX_INITIAL_GLOBAL_DEPTH,
            });
        }
        Ok(Self::from_parts(bucket_capacity, global_depth, hasher))
    }

    fn from_parts(bucket_capacity: usize, global_depth: u8, hasher: H) -> Self {
        Self {
            hasher,
            table: ExtendibleTable::new(bucket_capacity, global_depth),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn bucket_capacity(&self) -> usize {
        self.table.bucket_capacity()
    }

    /// Number of low hash bits the directory currently uses.
    pub fn global_depth(&self) -> u8 {
        self.table.global_depth()
    }

    /// Distinct buckets, at most `2^global_depth`.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Removes every entry and shrinks the directory back to two buckets.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter("clear");
        self.table.clear();
    }

    /// Visits every entry once, in no particular order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Linear scan over every bucket.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let _g = self.reentrancy.enter("contains_value");
        self.table.contains_value(value)
    }

    /// Checks every structural invariant: directory length, depth bounds,
    /// per-bucket slot counts of `2^(global_depth - local_depth)`, entry
    /// placement, bucket capacity and `len()`.
    pub fn validate(&self) -> Result<(), Error> {
        let _g = self.reentrancy.enter("validate");
        self.table.validate()
    }
}

impl<K, V, H> ExtendibleHashMap<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    /// Inserts or updates `key`, returning the previous value if there was one.
    ///
    /// Fails only with [`Error::HashSaturated`], when a full bucket's keys and
    /// `key` agree on all 32 hash bits; the map is left unchanged.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, Error> {
        let _g = self.reentrancy.enter("put");
        let hash = self.hasher.hash_key(&key);
        self.table.insert(hash, key, value)
    }

    /// Applies `put` to each pair in order, stopping at the first error.
    /// Pairs applied before the error stay applied.
    pub fn put_all<I>(&mut self, entries: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

impl<K, V, H> ExtendibleHashMap<K, V, H>
where
    K: Eq,
{
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let _g = self.reentrancy.enter("get");
        let hash = self.hasher.hash_key(key);
        self.table.find(hash, key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let _g = self.reentrancy.enter("get_mut");
        let hash = self.hasher.hash_key(key);
        self.table.find_mut(hash, key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let _g = self.reentrancy.enter("contains_key");
        let hash = self.hasher.hash_key(key);
        self.table.find(hash, key).is_some()
    }

    /// Removes `key`, returning its value. Absent keys leave the map as is.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let _g = self.reentrancy.enter("remove");
        let hash = self.hasher.hash_key(key);
        self.table.remove(hash, key)
    }
}

impl<'a, K, V, H> IntoIterator for &'a ExtendibleHashMap<K, V, H> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for ExtendibleHashMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.table, f)
    }
}

const _: () = assert!(MAX_INITIAL_GLOBAL_DEPTH < HASH_BITS);
