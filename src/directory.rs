//! Directory: a power-of-two slot table over an arena of shared buckets.
//!
//! Slots hold arena keys, never references. Each arena entry counts the
//! slots pointing at it; a bucket is freed exactly when its last slot is
//! repointed or truncated away. In every state reachable through the map,
//! a bucket at local depth `l` is referenced by `2^(global_depth - l)`
//! slots, all of which agree on their low `l` bits.
//!
//! Grow and collapse build a new slot vector and swap it in, so a collapsed
//! directory only keeps `2^global_depth` slots allocated. The arena keeps its
//! peak slot count: freed bucket slots are recycled by later splits rather
//! than returned to the allocator.

use crate::bucket::{hash_bit, Bucket};
use log::trace;
use slotmap::{new_key_type, SlotMap};

pub const MIN_GLOBAL_DEPTH: u8 = 1;
pub const HASH_BITS: u8 = 32;

new_key_type! {
    pub(crate) struct BucketId;
}

/// Arena entry: a bucket and the number of slots that reference it.
#[derive(Debug)]
pub(crate) struct Counted<B> {
    pub refs: usize,
    pub bucket: B,
}

#[inline]
fn index_bit(index: usize, pos: u8) -> bool {
    (index >> pos) & 1 == 1
}

pub(crate) struct Directory<K, V> {
    global_depth: u8,
    slots: Vec<BucketId>,
    arena: SlotMap<BucketId, Counted<Bucket<K, V>>>,
}

impl<K, V> Directory<K, V> {
    /// `2^global_depth` slots, each with its own empty bucket at full depth.
    pub fn new(global_depth: u8, bucket_capacity: usize) -> Self {
        debug_assert!((MIN_GLOBAL_DEPTH..HASH_BITS).contains(&global_depth));
        let len = 1usize << global_depth;
        let mut arena = SlotMap::with_capacity_and_key(len);
        let slots = (0..len)
            .map(|_| {
                arena.insert(Counted {
                    refs: 1,
                    bucket: Bucket::new(global_depth, bucket_capacity),
                })
            })
            .collect();
        Self {
            global_depth,
            slots,
            arena,
        }
    }

    pub fn global_depth(&self) -> u8 {
        self.global_depth
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.arena.len()
    }

    /// Directory index for `hash`: its low `global_depth` bits.
    #[inline]
    pub fn address_of(&self, hash: u32) -> usize {
        (hash as usize) & (self.slots.len() - 1)
    }

    #[inline]
    pub fn bucket_id(&self, index: usize) -> BucketId {
        self.slots[index]
    }

    #[inline]
    pub fn locate(&self, hash: u32) -> BucketId {
        self.slots[self.address_of(hash)]
    }

    #[inline]
    pub fn bucket(&self, id: BucketId) -> &Bucket<K, V> {
        &self
            .arena
            .get(id)
            .expect("directory slot refers to a freed bucket")
            .bucket
    }

    #[inline]
    pub fn bucket_mut(&mut self, id: BucketId) -> &mut Bucket<K, V> {
        &mut self
            .arena
            .get_mut(id)
            .expect("directory slot refers to a freed bucket")
            .bucket
    }

    pub fn refs(&self, id: BucketId) -> Option<usize> {
        self.arena.get(id).map(|c| c.refs)
    }

    /// Every bucket exactly once, in arena order.
    pub fn counted(&self) -> slotmap::basic::Iter<'_, BucketId, Counted<Bucket<K, V>>> {
        self.arena.iter()
    }

    pub fn pointers_to(&self, id: BucketId) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Points `index` at `id`. Returns the previous bucket if that was its
    /// last reference.
    pub fn repoint(&mut self, index: usize, id: BucketId) -> Option<Bucket<K, V>> {
        let old = self.slots[index];
        if old == id {
            return None;
        }
        self.slots[index] = id;
        self.arena
            .get_mut(id)
            .expect("repoint target must be live")
            .refs += 1;
        self.release(old)
    }

    fn release(&mut self, id: BucketId) -> Option<Bucket<K, V>> {
        let counted = self
            .arena
            .get_mut(id)
            .expect("released bucket must be live");
        counted.refs -= 1;
        if counted.refs == 0 {
            self.arena.remove(id).map(|c| c.bucket)
        } else {
            None
        }
    }

    /// Doubles the directory; slot `i + 2^d` mirrors slot `i`.
    pub fn grow(&mut self) {
        debug_assert!(self.global_depth < HASH_BITS);
        let mut next = Vec::with_capacity(self.slots.len() * 2);
        next.extend_from_slice(&self.slots);
        next.extend_from_slice(&self.slots);
        for &id in &self.slots {
            self.arena[id].refs += 1;
        }
        self.slots = next;
        self.global_depth += 1;
        trace!("directory grew to global depth {}", self.global_depth);
    }

    /// Every upper-half slot is either its lower mirror or an empty bucket.
    pub fn can_collapse(&self) -> bool {
        if self.global_depth <= MIN_GLOBAL_DEPTH {
            return false;
        }
        let half = self.slots.len() / 2;
        (half..self.slots.len()).all(|i| {
            let id = self.slots[i];
            id == self.slots[i - half] || self.bucket(id).is_empty()
        })
    }

    /// Halves the directory, dropping the upper half. Empty buckets that lose
    /// their last slot are freed.
    pub fn collapse(&mut self) {
        debug_assert!(self.can_collapse());
        let half = self.slots.len() / 2;
        let mut next = Vec::with_capacity(half);
        next.extend_from_slice(&self.slots[..half]);
        let dropped = core::mem::replace(&mut self.slots, next);
        for &id in &dropped[half..] {
            if let Some(freed) = self.release(id) {
                debug_assert!(freed.is_empty(), "collapse freed a bucket holding entries");
            }
        }
        self.global_depth -= 1;
        trace!("directory collapsed to global depth {}", self.global_depth);
    }

    /// Splits the bucket `id` on behalf of `hash` and repoints the slots
    /// whose newly significant bit disagrees with `hash` to the sibling.
    /// The bucket must sit shallower than the directory.
    pub fn split(&mut self, id: BucketId, hash: u32) {
        let old_depth = self.bucket(id).local_depth();
        debug_assert!(old_depth < self.global_depth);
        let sibling = self.bucket_mut(id).split(hash);
        let moved = sibling.len();
        let kept = self.bucket(id).len();
        let sibling_id = self.arena.insert(Counted {
            refs: 0,
            bucket: sibling,
        });

        let keep = hash_bit(hash, old_depth);
        for index in self.pointers_to(id) {
            if index_bit(index, old_depth) != keep {
                let freed = self.repoint(index, sibling_id);
                debug_assert!(freed.is_none());
            }
        }
        trace!(
            "split bucket at local depth {} -> {}: kept {}, moved {}",
            old_depth,
            old_depth + 1,
            kept,
            moved
        );
    }

    /// Merges the bucket at `index` with its buddy, the bucket found by
    /// flipping bit `local_depth - 1` of the index. Only same-depth buddies
    /// merge; a deeper buddy region has been split further and must fold
    /// back first. The bucket at `index` must be empty and survives.
    pub fn merge_with_buddy(&mut self, index: usize) -> bool {
        let id = self.slots[index];
        let depth = self.bucket(id).local_depth();
        if depth <= MIN_GLOBAL_DEPTH {
            return false;
        }
        let buddy = self.slots[index ^ (1usize << (depth - 1))];
        if buddy == id || self.bucket(buddy).local_depth() != depth {
            return false;
        }
        debug_assert!(self.bucket(id).is_empty());

        let mut freed = None;
        for slot in self.pointers_to(buddy) {
            if let Some(b) = self.repoint(slot, id) {
                freed = Some(b);
            }
        }
        let mut buddy_bucket =
            freed.expect("buddy must be released once all of its slots are repointed");
        let absorbed = buddy_bucket.len();
        self.bucket_mut(id).merge_from(&mut buddy_bucket);
        trace!(
            "merged buddy buckets at local depth {} -> {}, absorbed {} entries",
            depth,
            depth - 1,
            absorbed
        );
        true
    }

    /// Merges every empty bucket at full global depth with its buddy.
    /// Afterwards the collapse test reduces to "upper half mirrors lower".
    pub fn merge_empty_at_global_depth(&mut self) {
        for index in 0..self.slots.len() {
            let bucket = self.bucket(self.slots[index]);
            if bucket.is_empty() && bucket.local_depth() == self.global_depth {
                self.merge_with_buddy(index);
            }
        }
    }
}
