//! Key hashing collaborator.
//!
//! The map only ever looks at the low bits of a 32-bit hash, so any total,
//! deterministic function from key to `u32` works. Skewed distributions cost
//! bucket balance, never correctness.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Maps a key to the 32-bit hash the directory is addressed with.
pub trait KeyHasher<K: ?Sized> {
    fn hash_key(&self, key: &K) -> u32;
}

impl<K, F> KeyHasher<K> for F
where
    K: ?Sized,
    F: Fn(&K) -> u32,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u32 {
        self(key)
    }
}

/// Hashes through a [`BuildHasher`] and folds the 64-bit result to 32 bits.
///
/// Generic over the query type, so a map keyed by `String` can be probed with
/// `&str` as long as both hash identically (the `Borrow` contract).
#[derive(Clone, Debug, Default)]
pub struct DefaultKeyHasher<S = DefaultHashBuilder> {
    build: S,
}

impl<S> DefaultKeyHasher<S> {
    pub fn with_build_hasher(build: S) -> Self {
        Self { build }
    }

    pub fn build_hasher(&self) -> &S {
        &self.build
    }
}

impl<Q, S> KeyHasher<Q> for DefaultKeyHasher<S>
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u32 {
        fold(self.build.hash_one(key))
    }
}

#[inline]
fn fold(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;

    #[test]
    fn closures_are_key_hashers() {
        let identity = |k: &u32| *k;
        assert_eq!(identity.hash_key(&7), 7);

        let by_len = |s: &str| s.len() as u32;
        assert_eq!(by_len.hash_key("abcd"), 4);
    }

    /// Invariant: owned and borrowed forms of a key hash to the same value.
    #[test]
    fn default_hasher_agrees_across_borrow() {
        let h = DefaultKeyHasher::<RandomState>::default();
        let owned = String::from("key42");
        assert_eq!(h.hash_key(&owned), h.hash_key("key42"));
    }

    #[test]
    fn default_hasher_is_deterministic_per_instance() {
        let h: DefaultKeyHasher = DefaultKeyHasher::default();
        for i in 0..100u64 {
            assert_eq!(h.hash_key(&i), h.hash_key(&i));
        }
    }

    #[test]
    fn fold_mixes_high_half_into_low_half() {
        assert_eq!(fold(0x0000_0001_0000_0000), 1);
        assert_eq!(fold(0xffff_ffff_ffff_ffff), 0);
        assert_eq!(fold(0x0000_0000_dead_beef), 0xdead_beef);
    }
}
