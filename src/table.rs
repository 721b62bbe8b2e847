//! ExtendibleTable: insertion and deletion protocols over precomputed hashes.
//!
//! This layer never calls user hashing code; every method takes the key's
//! 32-bit hash from the caller and every stored entry keeps its own. Only
//! `K: Eq` (and `V: PartialEq` for value scans) run here.

use crate::bucket::{Bucket, Entry};
use crate::directory::{BucketId, Counted, Directory, HASH_BITS, MIN_GLOBAL_DEPTH};
use crate::error::Error;
use core::borrow::Borrow;
use core::fmt;

pub(crate) struct ExtendibleTable<K, V> {
    directory: Directory<K, V>,
    bucket_capacity: usize,
    len: usize,
}

impl<K, V> ExtendibleTable<K, V> {
    pub fn new(bucket_capacity: usize, global_depth: u8) -> Self {
        Self {
            directory: Directory::new(global_depth, bucket_capacity),
            bucket_capacity,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    pub fn global_depth(&self) -> u8 {
        self.directory.global_depth()
    }

    pub fn bucket_count(&self) -> usize {
        self.directory.bucket_count()
    }

    /// Drops every bucket and starts over at the minimum depth.
    pub fn clear(&mut self) {
        self.directory = Directory::new(MIN_GLOBAL_DEPTH, self.bucket_capacity);
        self.len = 0;
    }

    pub fn find<Q>(&self, hash: u32, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.directory
            .bucket(self.directory.locate(hash))
            .get(key, hash)
    }

    pub fn find_mut<Q>(&mut self, hash: u32, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let id = self.directory.locate(hash);
        self.directory.bucket_mut(id).get_mut(key, hash)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.directory
            .counted()
            .any(|(_, c)| c.bucket.contains_value(value))
    }

    /// Insert-or-update. Returns the previous value for an existing key.
    ///
    /// A full target bucket is split (growing the directory first when the
    /// bucket already uses every directory bit) and the insert retried. Each
    /// round deepens the bucket that owns `hash` by one bit, so the loop
    /// settles within `HASH_BITS` rounds.
    pub fn insert(&mut self, hash: u32, key: K, value: V) -> Result<Option<V>, Error>
    where
        K: Eq,
    {
        let (mut key, mut value) = (key, value);
        for round in 0..=HASH_BITS {
            let id = self.directory.locate(hash);
            let bucket = self.directory.bucket_mut(id);
            if let Some(index) = bucket.index_of(&key, hash) {
                return Ok(Some(bucket.replace(index, value)));
            }
            match bucket.insert(key, value, hash) {
                Ok(()) => {
                    self.len += 1;
                    return Ok(None);
                }
                Err((k, v)) => {
                    key = k;
                    value = v;
                }
            }
            // A bucket still full after a split holds the same entries as
            // before, so saturation can only show up in the first round.
            if round == 0 && bucket.is_saturated_by(hash) {
                return Err(Error::HashSaturated {
                    hash,
                    capacity: self.bucket_capacity,
                });
            }
            if bucket.local_depth() == self.directory.global_depth() {
                self.directory.grow();
            }
            self.directory.split(id, hash);
        }
        unreachable!("insert did not settle after {} splits", HASH_BITS);
    }

    /// Removes `key`. When that empties its bucket, folds it into its buddy
    /// (repeatedly, while the merged bucket stays empty) and then collapses
    /// the directory as far as it will go.
    pub fn remove<Q>(&mut self, hash: u32, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let index = self.directory.address_of(hash);
        let id = self.directory.bucket_id(index);
        let removed = self.directory.bucket_mut(id).remove(key, hash)?;
        self.len -= 1;

        if self.directory.bucket(id).is_empty()
            && self.directory.global_depth() > MIN_GLOBAL_DEPTH
        {
            while self.is_empty_at(index) && self.directory.merge_with_buddy(index) {}
            self.shrink();
        }
        Some(removed)
    }

    fn is_empty_at(&self, index: usize) -> bool {
        self.directory
            .bucket(self.directory.bucket_id(index))
            .is_empty()
    }

    fn shrink(&mut self) {
        while self.directory.global_depth() > MIN_GLOBAL_DEPTH {
            self.directory.merge_empty_at_global_depth();
            if !self.directory.can_collapse() {
                break;
            }
            self.directory.collapse();
        }
        debug_assert!(
            self.directory.global_depth() > MIN_GLOBAL_DEPTH
                || self
                    .directory
                    .counted()
                    .all(|(_, c)| c.bucket.local_depth() == MIN_GLOBAL_DEPTH),
            "bucket left deeper than a minimal directory"
        );
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.directory.counted(),
            current: [].iter(),
            remaining: self.len,
        }
    }

    /// Walks the whole structure and reports the first broken invariant.
    pub fn validate(&self) -> Result<(), Error> {
        let dir = &self.directory;
        let global = dir.global_depth();
        let violation = |slot: usize, reason: String| Err(Error::InvariantViolation { slot, reason });

        if global < MIN_GLOBAL_DEPTH || global > HASH_BITS {
            return violation(0, format!("global depth {} out of range", global));
        }
        if dir.len() != 1usize << global {
            return violation(
                0,
                format!("directory has {} slots at global depth {}", dir.len(), global),
            );
        }

        for slot in 0..dir.len() {
            let id = dir.bucket_id(slot);
            let Some(refs) = dir.refs(id) else {
                return violation(slot, "points at a freed bucket".to_string());
            };
            let bucket = dir.bucket(id);
            let local = bucket.local_depth();
            if local < MIN_GLOBAL_DEPTH || local > global {
                return violation(
                    slot,
                    format!("local depth {} outside 1..={}", local, global),
                );
            }
            let expected = 1usize << (global - local);
            if refs != expected {
                return violation(
                    slot,
                    format!("bucket has {} references, expected {}", refs, expected),
                );
            }
            let mask = (1usize << local) - 1;
            if let Some(e) = bucket
                .entries()
                .iter()
                .find(|e| (e.hash as usize) & mask != slot & mask)
            {
                return violation(
                    slot,
                    format!("entry hash {:#010x} does not match local depth {}", e.hash, local),
                );
            }
            if bucket.len() > self.bucket_capacity {
                return violation(slot, format!("bucket holds {} entries", bucket.len()));
            }
        }

        let mut entries = 0;
        for (id, counted) in dir.counted() {
            let pointing = dir.pointers_to(id);
            if pointing.len() != counted.refs {
                let slot = pointing.first().copied().unwrap_or(0);
                return violation(
                    slot,
                    format!(
                        "bucket counts {} references but {} slots point at it",
                        counted.refs,
                        pointing.len()
                    ),
                );
            }
            entries += counted.bucket.len();
        }
        if entries != self.len {
            return violation(
                0,
                format!("len is {} but buckets hold {} entries", self.len, entries),
            );
        }
        Ok(())
    }
}

/// Iterator over `(&K, &V)` in unspecified order.
pub struct Iter<'a, K, V> {
    buckets: slotmap::basic::Iter<'a, BucketId, Counted<Bucket<K, V>>>,
    current: core::slice::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            let (_, counted) = self.buckets.next()?;
            self.current = counted.bucket.entries().iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for ExtendibleTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct BucketView<'a, K, V> {
            slots: Vec<usize>,
            bucket: &'a Bucket<K, V>,
        }
        impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BucketView<'_, K, V> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct("Bucket")
                    .field("local_depth", &self.bucket.local_depth())
                    .field("slots", &self.slots)
                    .field(
                        "entries",
                        &self
                            .bucket
                            .entries()
                            .iter()
                            .map(|e| (&e.key, &e.value))
                            .collect::<Vec<_>>(),
                    )
                    .finish()
            }
        }

        let mut buckets: Vec<BucketView<'_, K, V>> = self
            .directory
            .counted()
            .map(|(id, c)| BucketView {
                slots: self.directory.pointers_to(id),
                bucket: &c.bucket,
            })
            .collect();
        buckets.sort_by_key(|b| b.slots.first().copied());

        f.debug_struct("ExtendibleHashMap")
            .field("len", &self.len)
            .field("global_depth", &self.directory.global_depth())
            .field("bucket_capacity", &self.bucket_capacity)
            .field("buckets", &buckets)
            .finish()
    }
}
