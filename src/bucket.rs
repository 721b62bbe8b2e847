//! Bucket: a bounded run of entries that share their low `local_depth` hash bits.

use crate::directory::MIN_GLOBAL_DEPTH;
use core::borrow::Borrow;

/// Stored entry. The hash is computed once at insertion and reused by every
/// split and merge, so the key hasher is never called on stored keys.
#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub key: K,
    pub value: V,
    pub hash: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct Bucket<K, V> {
    local_depth: u8,
    capacity: usize,
    // Contiguous from index 0; never longer than `capacity`.
    entries: Vec<Entry<K, V>>,
}

#[inline]
pub(crate) fn hash_bit(hash: u32, pos: u8) -> bool {
    (hash >> pos) & 1 == 1
}

impl<K, V> Bucket<K, V> {
    pub fn new(local_depth: u8, capacity: usize) -> Self {
        debug_assert!(local_depth >= MIN_GLOBAL_DEPTH);
        debug_assert!(capacity > 0);
        Self {
            local_depth,
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn local_depth(&self) -> u8 {
        self.local_depth
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn entries(&self) -> &[Entry<K, V>] {
        &self.entries
    }

    pub fn index_of<Q>(&self, key: &Q, hash: u32) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.entries
            .iter()
            .position(|e| e.hash == hash && e.key.borrow() == key)
    }

    pub fn get<Q>(&self, key: &Q, hash: u32) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.index_of(key, hash).map(|i| &self.entries[i].value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q, hash: u32) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let i = self.index_of(key, hash)?;
        Some(&mut self.entries[i].value)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.entries.iter().any(|e| e.value == *value)
    }

    /// Overwrites the value at `index`, returning the previous one.
    pub fn replace(&mut self, index: usize, value: V) -> V {
        core::mem::replace(&mut self.entries[index].value, value)
    }

    /// Appends a new entry. Hands the pair back when the bucket is full.
    /// Callers check for an existing key first.
    pub fn insert(&mut self, key: K, value: V, hash: u32) -> Result<(), (K, V)> {
        if self.is_full() {
            return Err((key, value));
        }
        self.entries.push(Entry { key, value, hash });
        Ok(())
    }

    /// Removes the entry and shifts the tail left.
    pub fn remove<Q>(&mut self, key: &Q, hash: u32) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let i = self.index_of(key, hash)?;
        let Entry { key, value, .. } = self.entries.remove(i);
        Some((key, value))
    }

    /// True when the bucket is full and every stored hash equals `hash`:
    /// no amount of splitting can make room for another key with that hash.
    pub fn is_saturated_by(&self, hash: u32) -> bool {
        self.is_full() && self.entries.iter().all(|e| e.hash == hash)
    }

    /// Deepens this bucket by one bit and moves every entry whose newly
    /// significant bit differs from `hash`'s into a fresh sibling at the
    /// same depth. The sibling may come back empty.
    pub fn split(&mut self, hash: u32) -> Bucket<K, V> {
        let pos = self.local_depth;
        debug_assert!(pos < 32, "cannot split past the hash width");
        self.local_depth += 1;

        let keep = hash_bit(hash, pos);
        let (stay, moved): (Vec<_>, Vec<_>) = core::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| hash_bit(e.hash, pos) == keep);
        self.entries = stay;
        self.entries.reserve(self.capacity - self.entries.len());

        let mut sibling = Bucket::new(self.local_depth, self.capacity);
        sibling.entries.extend(moved);
        sibling
    }

    /// Takes every entry of `sibling` into this (empty) bucket, then lifts
    /// both one level shallower.
    pub fn merge_from(&mut self, sibling: &mut Bucket<K, V>) {
        debug_assert!(self.is_empty(), "merge target must be empty");
        self.entries.append(&mut sibling.entries);
        self.decrement_depth();
        sibling.decrement_depth();
    }

    pub fn decrement_depth(&mut self) {
        if self.local_depth > MIN_GLOBAL_DEPTH {
            self.local_depth -= 1;
        }
    }
}
