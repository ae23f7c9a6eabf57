//! Integration tests for the B+tree index.
//!
//! These drive whole trees through the public API: split propagation, root
//! growth, leaf chaining and persistence across sessions.

use pageidx::common::config::IndexConfig;
use pageidx::{BTreeIndex, Key, LeafNode, OpenMode, PageId, RecordId};
use proptest::prelude::*;
use tempfile::{tempdir, TempDir};

fn rid(key: Key) -> RecordId {
    RecordId::new(PageId::new(key.unsigned_abs()), (key & 0xff) as u32)
}

fn create_index(capacity: Option<usize>) -> (BTreeIndex, TempDir) {
    let dir = tempdir().unwrap();
    let mut config = IndexConfig::new();
    if let Some(capacity) = capacity {
        config = config
            .with_leaf_capacity(capacity)
            .with_internal_capacity(capacity);
    }
    let index = BTreeIndex::open_with(dir.path().join("test.idx"), OpenMode::Write, config).unwrap();
    (index, dir)
}

fn scan_keys(index: &mut BTreeIndex) -> Vec<Key> {
    index.scan().unwrap().map(|e| e.unwrap().0).collect()
}

/// Depth of every leaf, found by walking child pointers from the root.
fn leaf_depths(index: &mut BTreeIndex) -> Vec<u32> {
    fn walk(index: &mut BTreeIndex, page_id: PageId, depth: u32, out: &mut Vec<u32>) {
        if depth == index.tree_height() {
            index.read_leaf(page_id).unwrap();
            out.push(depth);
            return;
        }
        let node = index.read_internal(page_id).unwrap();
        let mut children = vec![node.leading_child()];
        children.extend(node.entries().iter().map(|e| e.child));
        for child in children {
            walk(index, child, depth + 1, out);
        }
    }

    let mut depths = Vec::new();
    if !index.is_empty() {
        let root = index.root_page_id();
        walk(index, root, 1, &mut depths);
    }
    depths
}

/// Ascending inserts one past a full leaf leave exactly two leaves.
#[test]
fn test_ascending_inserts_split_once() {
    let (mut index, _dir) = create_index(None);
    let c = LeafNode::MAX_ENTRIES as Key;
    let n = c + 1;

    for k in 1..=n {
        index.insert(k, rid(k)).unwrap();
    }

    let leaves = index.leaf_page_ids().unwrap();
    assert_eq!(leaves.len(), 2);
    assert_eq!(index.tree_height(), 2);

    let split = (n + 1) / 2;
    let first = index.read_leaf(leaves[0]).unwrap();
    let first_keys: Vec<Key> = first.entries().iter().map(|e| e.key).collect();
    assert_eq!(first_keys, (1..=split).collect::<Vec<_>>());
    assert_eq!(first.next_sibling(), leaves[1]);

    let mut cursor = index.locate(1).unwrap();
    let mut keys = Vec::new();
    while let Some((key, found)) = index.read_forward(&mut cursor).unwrap() {
        assert_eq!(found, rid(key));
        keys.push(key);
    }
    assert_eq!(keys, (1..=n).collect::<Vec<_>>());
}

/// Descending inserts still scan back in ascending order.
#[test]
fn test_descending_inserts_scan_ascending() {
    let (mut index, _dir) = create_index(Some(4));

    for k in (1..=500).rev() {
        index.insert(k, rid(k)).unwrap();
    }

    assert_eq!(scan_keys(&mut index), (1..=500).collect::<Vec<_>>());
    assert!(leaf_depths(&mut index).iter().all(|&d| d == index.tree_height()));
}

/// Height grows one level per root split and every leaf stays at the bottom.
#[test]
fn test_internal_splits_grow_height_by_one() {
    let (mut index, _dir) = create_index(Some(3));
    let mut k = 0;

    while index.tree_height() < 2 {
        k += 1;
        index.insert(k, rid(k)).unwrap();
    }
    let base_height = index.tree_height();

    while index.tree_height() < base_height + 2 {
        let (root, height) = (index.root_page_id(), index.tree_height());
        k += 1;
        index.insert(k, rid(k)).unwrap();

        if index.root_page_id() == root {
            assert_eq!(index.tree_height(), height);
        } else {
            assert_eq!(index.tree_height(), height + 1);
        }
    }

    let height = index.tree_height();
    assert_eq!(height, base_height + 2);
    assert!(leaf_depths(&mut index).iter().all(|&d| d == height));

    for target in [1, k / 3, k / 2, k] {
        let mut cursor = index.locate(target).unwrap();
        let leaf = index.read_leaf(cursor.page_id).unwrap();
        assert_eq!(leaf.entries()[cursor.index].key, target);
        assert_eq!(index.read_forward(&mut cursor).unwrap(), Some((target, rid(target))));
    }
}

#[test]
fn test_locate_on_empty_tree_is_end() {
    let (mut index, _dir) = create_index(None);
    let mut cursor = index.locate(0).unwrap();
    assert!(cursor.is_end());
    assert_eq!(index.read_forward(&mut cursor).unwrap(), None);
    assert!(index.leaf_page_ids().unwrap().is_empty());
}

#[test]
fn test_zero_and_negative_keys() {
    let (mut index, _dir) = create_index(Some(4));
    for k in [0, -1, 5, -100, 3, 0, i32::MIN, i32::MAX] {
        index.insert(k, rid(k)).unwrap();
    }

    assert_eq!(
        scan_keys(&mut index),
        vec![i32::MIN, -100, -1, 0, 0, 3, 5, i32::MAX]
    );

    let mut cursor = index.locate(-50).unwrap();
    assert_eq!(index.read_forward(&mut cursor).unwrap().unwrap().0, -1);
}

#[test]
fn test_duplicates_across_leaves_are_all_found() {
    let (mut index, _dir) = create_index(Some(3));
    for k in [1, 2] {
        index.insert(k, rid(k)).unwrap();
    }
    for _ in 0..10 {
        index.insert(7, rid(7)).unwrap();
    }
    index.insert(9, rid(9)).unwrap();
    assert!(index.leaf_page_ids().unwrap().len() > 2);

    let found: Vec<Key> = index.scan_from(7).unwrap().map(|e| e.unwrap().0).collect();
    assert_eq!(found, [vec![7; 10], vec![9]].concat());
}

#[test]
fn test_index_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("persist.idx");
    let config = IndexConfig::new().with_leaf_capacity(5).with_internal_capacity(5);

    {
        let mut index = BTreeIndex::open_with(&path, OpenMode::Write, config).unwrap();
        for k in (0..300).map(|i| (i * 37) % 300) {
            index.insert(k, rid(k)).unwrap();
        }
        index.close().unwrap();
    }

    {
        let mut index = BTreeIndex::open_with(&path, OpenMode::Write, config).unwrap();
        for k in 300..400 {
            index.insert(k, rid(k)).unwrap();
        }
        index.close().unwrap();
    }

    let mut index = BTreeIndex::open(&path, OpenMode::Read).unwrap();
    assert_eq!(scan_keys(&mut index), (0..400).collect::<Vec<_>>());
}

#[test]
fn test_open_missing_index_for_read_fails() {
    let dir = tempdir().unwrap();
    let result = BTreeIndex::open(dir.path().join("missing.idx"), OpenMode::Read);
    assert!(matches!(result, Err(pageidx::Error::Open { .. })));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A full scan returns exactly the inserted keys, sorted.
    #[test]
    fn prop_scan_returns_inserted_multiset(
        keys in prop::collection::vec(any::<i32>(), 0..400),
        capacity in 3usize..12,
    ) {
        let (mut index, _dir) = create_index(Some(capacity));
        for &k in &keys {
            index.insert(k, rid(k)).unwrap();
        }

        let mut expected = keys.clone();
        expected.sort();
        prop_assert_eq!(scan_keys(&mut index), expected);
    }

    /// `locate(k)` yields the smallest stored key `>= k`.
    #[test]
    fn prop_locate_finds_smallest_key_not_below(
        keys in prop::collection::vec(-1000i32..1000, 1..300),
        targets in prop::collection::vec(-1100i32..1100, 1..20),
        capacity in 3usize..8,
    ) {
        let (mut index, _dir) = create_index(Some(capacity));
        for &k in &keys {
            index.insert(k, rid(k)).unwrap();
        }

        for target in targets {
            let expected = keys.iter().copied().filter(|&k| k >= target).min();
            let mut cursor = index.locate(target).unwrap();
            let found = index.read_forward(&mut cursor).unwrap().map(|(k, _)| k);
            prop_assert_eq!(found, expected);
        }
    }

    /// Long runs of equal keys spanning many leaves still scan sorted and
    /// locate the smallest key `>= k`.
    #[test]
    fn prop_heavy_duplicates_stay_ordered(
        keys in prop::collection::vec(0i32..4, 1..200),
        capacity in 3usize..8,
    ) {
        let (mut index, _dir) = create_index(Some(capacity));
        for &k in &keys {
            index.insert(k, rid(k)).unwrap();
        }

        let mut expected = keys.clone();
        expected.sort();
        prop_assert_eq!(scan_keys(&mut index), expected);

        for target in -1i32..5 {
            let smallest = keys.iter().copied().filter(|&k| k >= target).min();
            let mut cursor = index.locate(target).unwrap();
            let found = index.read_forward(&mut cursor).unwrap().map(|(k, _)| k);
            prop_assert_eq!(found, smallest);

            let remaining = index.scan_from(target).unwrap().count();
            prop_assert_eq!(remaining, keys.iter().filter(|&&k| k >= target).count());
        }
    }

    /// Splits keep the tree balanced and non-root leaves at least half full.
    #[test]
    fn prop_splits_keep_tree_balanced(
        keys in prop::collection::vec(any::<i32>(), 1..400),
        capacity in 3usize..10,
    ) {
        let (mut index, _dir) = create_index(Some(capacity));
        for &k in &keys {
            index.insert(k, rid(k)).unwrap();
        }

        let height = index.tree_height();
        prop_assert!(leaf_depths(&mut index).iter().all(|&d| d == height));

        let leaves = index.leaf_page_ids().unwrap();
        prop_assert_eq!(leaves.len(), leaf_depths(&mut index).len());
        if height > 1 {
            for page_id in leaves {
                let leaf = index.read_leaf(page_id).unwrap();
                prop_assert!(leaf.entry_count() >= (capacity + 1) / 2);
            }
        }
    }
}
