//! extendible-hashmap: a single-threaded map addressed through an
//! extendible-hashing directory, growing and shrinking one bucket at a time.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a resident key-value index whose growth cost is bounded by one
//!   bucket split (plus, occasionally, a directory doubling) rather than a
//!   full rehash, and which gives directory memory back symmetrically on removal.
//! - Layers:
//!   - Bucket<K, V>: a bounded, contiguous run of entries with a local
//!     depth; knows how to split on a newly significant hash bit and how
//!     to absorb an emptied buddy.
//!   - Directory<K, V>: `2^global_depth` slots holding slotmap keys into a
//!     bucket arena; each arena entry counts its referencing slots, so
//!     shared ownership is explicit and a bucket is freed exactly when its
//!     last slot moves away. Owns grow, collapse, split repointing and
//!     buddy merges.
//!   - ExtendibleTable<K, V>: the insertion and deletion protocols over
//!     precomputed hashes, size bookkeeping and structural validation.
//!   - ExtendibleHashMap<K, V, H>: public API; hashes keys once per call,
//!     checks construction preconditions, guards entry points against
//!     reentrancy in debug builds.
//!
//! Invariants (checked by `ExtendibleHashMap::validate`)
//! - The directory has `2^global_depth` slots, `global_depth >= 1`.
//! - Every bucket has `1 <= local_depth <= global_depth` and is referenced
//!   by exactly `2^(global_depth - local_depth)` slots.
//! - Every entry's hash agrees with each referencing slot index on the low
//!   `local_depth` bits.
//! - No bucket exceeds the configured capacity; `len()` equals the number
//!   of stored entries.
//!
//! Growth and shrink
//! - Insert into a full bucket: if the bucket already uses every directory
//!   bit, double the directory (slot `i + 2^d` mirrors slot `i`); split the
//!   bucket on bit `local_depth` and repoint the disagreeing half of its
//!   slots to the new sibling; retry. The retry is a bounded loop, since a
//!   split can send every entry the same way.
//! - Remove that empties a bucket: merge it with its same-depth buddy
//!   (flip bit `local_depth - 1` of the slot index), cascading while the
//!   result is still empty; then fold every empty bucket at full global
//!   depth into its buddy and halve the directory while its upper half
//!   mirrors the lower half. Local depths stay exact throughout, so a
//!   directory back at depth 1 never needs its buckets patched.
//!
//! Hashing
//! - Keys hash to `u32` through a `KeyHasher`, either any `Fn(&K) -> u32`
//!   or `DefaultKeyHasher` over a `BuildHasher`. Each entry stores its hash;
//!   splits and merges never call the hasher again.
//!
//! Notes and non-goals
//! - Single-threaded: `Send` but `!Sync`. Hosts serialize access, e.g. with
//!   a `Mutex` around the whole map.
//! - In-memory only; no persistence or on-disk layout.
//! - Iteration order is unspecified and not stable across mutation.
//! - If more than `bucket_capacity` keys share all 32 hash bits, no split
//!   can separate them; `put` reports `Error::HashSaturated` instead of
//!   chaining overflow entries.
//! - Structural events (grow, split, merge, collapse) are logged through the
//!   `log` facade at trace level.

mod bucket;
mod directory;
mod error;
mod extendible_hash_map;
mod extendible_hash_map_proptest;
mod hasher;
mod reentrancy;
mod table;

// Public surface
pub use directory::{HASH_BITS, MIN_GLOBAL_DEPTH};
pub use error::Error;
pub use extendible_hash_map::{
    ExtendibleHashMap, DEFAULT_BUCKET_CAPACITY, MAX_INITIAL_GLOBAL_DEPTH,
};
pub use hasher::{DefaultKeyHasher, KeyHasher};
pub use table::Iter;
