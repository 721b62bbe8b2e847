use extendible_hashmap::{Error, ExtendibleHashMap, KeyHasher, DEFAULT_BUCKET_CAPACITY};

fn identity(k: &u32) -> u32 {
    *k
}

fn small_map(capacity: usize) -> ExtendibleHashMap<u32, String, fn(&u32) -> u32> {
    ExtendibleHashMap::with_hasher(capacity, identity as fn(&u32) -> u32).expect("valid capacity")
}

#[test]
fn third_key_in_full_bucket_grows_directory() {
    let mut m = small_map(2);
    assert_eq!(m.put(2, "2".into()).unwrap(), None);
    assert_eq!(m.put(6, "6".into()).unwrap(), None);
    assert_eq!(m.global_depth(), 1);

    assert_eq!(m.put(10, "10".into()).unwrap(), None);
    assert!(m.global_depth() > 1);
    assert_eq!(m.len(), 3);
    for k in [2, 6, 10] {
        assert!(m.contains_key(&k));
        assert_eq!(m.get(&k).map(String::as_str), Some(k.to_string().as_str()));
    }
    m.validate().unwrap();
}

#[test]
fn removing_split_key_keeps_the_rest() {
    let mut m = small_map(2);
    for k in [2, 6, 10] {
        m.put(k, k.to_string()).unwrap();
    }
    assert_eq!(m.global_depth(), 3);
    assert_eq!(m.bucket_count(), 4);

    // 10 shares its bucket with 2, so nothing merges yet
    assert_eq!(m.remove(&10).as_deref(), Some("10"));
    assert_eq!(m.len(), 2);
    assert!(!m.contains_key(&10));
    assert_eq!(m.global_depth(), 3);
    assert_eq!(m.bucket_count(), 4);
    m.validate().unwrap();
}

#[test]
fn emptying_a_split_bucket_merges_and_collapses() {
    let mut m = small_map(2);
    for k in [2, 6, 10] {
        m.put(k, k.to_string()).unwrap();
    }
    // 6 sits alone at local depth 3; its buddy holds 2 and 10
    assert_eq!(m.remove(&6).as_deref(), Some("6"));
    assert_eq!(m.len(), 2);
    assert!(!m.contains_key(&6));
    assert!(m.contains_key(&2));
    assert!(m.contains_key(&10));
    assert_eq!(m.global_depth(), 1);
    assert_eq!(m.bucket_count(), 2);
    m.validate().unwrap();

    assert_eq!(m.remove(&2).as_deref(), Some("2"));
    assert_eq!(m.remove(&10).as_deref(), Some("10"));
    assert!(m.is_empty());
    assert_eq!(m.global_depth(), 1);
    assert_eq!(m.bucket_count(), 2);
}

#[test]
fn put_existing_key_returns_previous_value() {
    let mut m = small_map(2);
    assert_eq!(m.put(5, "x".into()).unwrap(), None);
    assert_eq!(m.put(5, "y".into()).unwrap().as_deref(), Some("x"));
    assert_eq!(m.get(&5).map(String::as_str), Some("y"));
    assert_eq!(m.len(), 1);
    assert_eq!(m.global_depth(), 1);
}

#[test]
fn remove_on_empty_map_is_none() {
    let mut m = small_map(2);
    assert_eq!(m.remove(&7), None);
    assert_eq!(m.len(), 0);
    assert!(m.is_empty());
    assert_eq!(m.global_depth(), 1);
}

#[test]
fn colliding_low_bits_grow_until_discriminated() {
    // 0, 8 and 16 agree on their low three bits; bit 3 separates 8.
    let mut m = small_map(2);
    for k in [0, 8, 16] {
        assert_eq!(m.put(k, k.to_string()).unwrap(), None);
    }
    assert_eq!(m.len(), 3);
    assert_eq!(m.global_depth(), 4);
    for k in [0, 8, 16] {
        assert!(m.contains_key(&k));
    }
    m.validate().unwrap();
}

const MANY_SPLITS: [u32; 12] = [
    2, 6, 10, 114, 242, 498, 1010, 2034, 4082, 8178, 16370, 32754,
];

fn fill_and_drain(m: &mut ExtendibleHashMap<u32, String, fn(&u32) -> u32>) {
    for k in MANY_SPLITS {
        assert_eq!(m.put(k, k.to_string()).unwrap(), None);
    }
    assert_eq!(m.len(), MANY_SPLITS.len());
    for k in MANY_SPLITS {
        assert!(m.contains_key(&k));
        assert!(m.contains_value(&k.to_string()));
    }
    m.validate().unwrap();

    for k in MANY_SPLITS {
        assert_eq!(m.remove(&k), Some(k.to_string()));
        m.validate().unwrap();
    }
    assert_eq!(m.len(), 0);
    assert_eq!(m.global_depth(), 1);
    assert_eq!(m.bucket_count(), 2);
}

#[test]
fn many_splits_fill_drain_refill() {
    for capacity in 1..=4 {
        let mut m = small_map(capacity);
        fill_and_drain(&mut m);
        fill_and_drain(&mut m);
    }
}

#[test]
fn many_splits_reach_deep_directory() {
    let mut m = small_map(1);
    for k in MANY_SPLITS {
        m.put(k, k.to_string()).unwrap();
    }
    // 16370 and 32754 differ first at bit 14.
    assert_eq!(m.global_depth(), 15);
    assert_eq!(m.bucket_count(), 16);
}

#[test]
fn removing_in_reverse_order_also_collapses() {
    let mut m = small_map(1);
    for k in MANY_SPLITS {
        m.put(k, k.to_string()).unwrap();
    }
    for k in MANY_SPLITS.iter().rev() {
        assert!(m.remove(k).is_some());
        m.validate().unwrap();
    }
    assert_eq!(m.global_depth(), 1);
}

#[test]
fn default_hasher_handles_many_string_keys() {
    let mut m: ExtendibleHashMap<String, usize> = ExtendibleHashMap::new();
    assert_eq!(m.bucket_capacity(), DEFAULT_BUCKET_CAPACITY);
    for i in 0..10_000 {
        assert_eq!(m.put(format!("key-{i}"), i).unwrap(), None);
    }
    assert_eq!(m.len(), 10_000);
    m.validate().unwrap();

    for i in (0..10_000).step_by(2) {
        assert_eq!(m.remove(format!("key-{i}").as_str()), Some(i));
    }
    assert_eq!(m.len(), 5_000);
    m.validate().unwrap();
    for i in 0..10_000 {
        assert_eq!(m.get(format!("key-{i}").as_str()).is_some(), i % 2 == 1);
    }
}

#[test]
fn put_all_inserts_every_entry() {
    let mut m = small_map(2);
    m.put_all((0..64u32).map(|k| (k, k.to_string()))).unwrap();
    assert_eq!(m.len(), 64);
    let mut keys: Vec<u32> = m.keys().copied().collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..64).collect::<Vec<_>>());
}

#[test]
fn saturated_hash_is_reported_and_map_unchanged() {
    let constant = |_: &u32| 7u32;
    let mut m = ExtendibleHashMap::with_hasher(2, constant).unwrap();
    m.put(1, 'a').unwrap();
    m.put(2, 'b').unwrap();
    let err = m.put(3, 'c').unwrap_err();
    assert_eq!(err, Error::HashSaturated { hash: 7, capacity: 2 });
    assert_eq!(m.len(), 2);
    assert_eq!(m.global_depth(), 1);
    assert!(!m.contains_key(&3));
    // updating a stored key is still fine
    assert_eq!(m.put(2, 'z').unwrap(), Some('b'));
    assert_eq!(m.hasher().hash_key(&3), 7);
    m.validate().unwrap();
}

#[test]
fn clear_resets_shape() {
    let mut m = small_map(1);
    for k in MANY_SPLITS {
        m.put(k, k.to_string()).unwrap();
    }
    m.clear();
    assert!(m.is_empty());
    assert_eq!(m.global_depth(), 1);
    assert_eq!(m.bucket_count(), 2);
    assert_eq!(m.bucket_capacity(), 1);
    assert_eq!(m.iter().count(), 0);
    m.put(3, "3".into()).unwrap();
    assert_eq!(m.len(), 1);
}

#[test]
fn iteration_visits_each_entry_once() {
    let mut m = small_map(3);
    for k in 0..100u32 {
        m.put(k * 3, k.to_string()).unwrap();
    }
    let it = m.iter();
    assert_eq!(it.len(), 100);
    let mut seen: Vec<u32> = (&m).into_iter().map(|(k, _)| *k).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..100).map(|k| k * 3).collect::<Vec<_>>());
    let total: usize = m.values().map(String::len).sum();
    assert_eq!(total, (0..100u32).map(|k| k.to_string().len()).sum::<usize>());
}

#[test]
fn debug_dump_lists_buckets() {
    let mut m = small_map(2);
    for k in [2, 6, 10] {
        m.put(k, k.to_string()).unwrap();
    }
    let dump = format!("{m:?}");
    assert!(dump.contains("ExtendibleHashMap"));
    assert!(dump.contains("global_depth"));
    assert!(dump.contains("local_depth"));
    assert!(dump.contains("\"10\""));
}

#[test]
fn rejected_construction() {
    assert_eq!(
        ExtendibleHashMap::<u32, u32>::with_bucket_capacity(0).unwrap_err(),
        Error::ZeroBucketCapacity
    );
    assert!(matches!(
        ExtendibleHashMap::<u32, u32, _>::with_depth_and_hasher(2, 0, identity),
        Err(Error::InvalidGlobalDepth { requested: 0, .. })
    ));
}
