//! Integration tests for loading tables and selecting through the index.

use std::fs;

use pageidx::common::config::IndexConfig;
use pageidx::query::{Attr, CompOp, Condition, Projection, QueryEngine};
use pageidx::{Error, Key};
use tempfile::{tempdir, TempDir};

const ROWS: Key = 600;

fn title(key: Key) -> String {
    format!("Movie {:04}", (key * 7) % 1000)
}

/// Loads the same rows into `indexed` (with an index) and `plain` (without).
fn setup() -> (QueryEngine, TempDir) {
    let dir = tempdir().unwrap();
    let load_file = dir.path().join("movie.del");

    let mut lines = String::new();
    for i in 0..ROWS {
        let key = (i * 211) % ROWS;
        lines.push_str(&format!("{}, '{}'\n", key, title(key)));
    }
    lines.push_str("not a row\n");
    fs::write(&load_file, lines).unwrap();

    let config = IndexConfig::new().with_leaf_capacity(8).with_internal_capacity(4);
    let engine = QueryEngine::new(dir.path()).with_index_config(config);

    for (table, with_index) in [("indexed", true), ("plain", false)] {
        let summary = engine.load(table, &load_file, with_index).unwrap();
        assert_eq!(summary.loaded, ROWS as usize);
        assert_eq!(summary.skipped, 1);
    }
    assert!(engine.index_path("indexed").exists());
    assert!(!engine.index_path("plain").exists());

    (engine, dir)
}

fn sorted_keys(engine: &QueryEngine, table: &str, conditions: &[Condition]) -> Vec<Key> {
    let mut keys = engine.select(Projection::Key, table, conditions).unwrap().keys();
    keys.sort();
    keys
}

#[test]
fn test_index_and_scan_agree() {
    let (engine, _dir) = setup();

    let cases: Vec<Vec<Condition>> = vec![
        vec![Condition::key(CompOp::Eq, 123)],
        vec![Condition::key(CompOp::Eq, ROWS + 5)],
        vec![Condition::key(CompOp::Gt, 550)],
        vec![Condition::key(CompOp::Ge, 100), Condition::key(CompOp::Lt, 140)],
        vec![Condition::key(CompOp::Le, 20)],
        vec![Condition::key(CompOp::Gt, 10), Condition::key(CompOp::Ge, 300), Condition::key(CompOp::Le, 310)],
        vec![Condition::key(CompOp::Lt, 50), Condition::key(CompOp::Ne, 25)],
        vec![Condition::key(CompOp::Ge, 200), Condition::value(CompOp::Lt, "Movie 0500")],
    ];

    for conditions in cases {
        let expected: Vec<Key> = (0..ROWS)
            .filter(|&k| conditions.iter().all(|c| c.matches(k, &title(k)).unwrap()))
            .collect();

        assert_eq!(sorted_keys(&engine, "plain", &conditions), expected, "{:?}", conditions);
        assert_eq!(sorted_keys(&engine, "indexed", &conditions), expected, "{:?}", conditions);
    }
}

#[test]
fn test_index_used_only_for_bounding_key_conditions() {
    let (engine, _dir) = setup();

    let ranged = engine
        .select(Projection::Key, "indexed", &[Condition::key(CompOp::Lt, 10)])
        .unwrap();
    assert!(ranged.used_index);
    assert_eq!(ranged.keys(), (0..10).collect::<Vec<_>>());

    let not_equal = engine
        .select(Projection::Count, "indexed", &[Condition::key(CompOp::Ne, 10)])
        .unwrap();
    assert!(!not_equal.used_index);
    assert_eq!(not_equal.count, ROWS as usize - 1);

    let by_value = engine
        .select(Projection::Count, "indexed", &[Condition::value(CompOp::Eq, title(42))])
        .unwrap();
    assert!(!by_value.used_index);
    assert!(by_value.count >= 1);

    let plain = engine
        .select(Projection::Key, "plain", &[Condition::key(CompOp::Lt, 10)])
        .unwrap();
    assert!(!plain.used_index);
}

#[test]
fn test_projections_render() {
    let (engine, _dir) = setup();
    let conditions = [Condition::key(CompOp::Eq, 3)];

    let all = engine.select(Projection::All, "indexed", &conditions).unwrap();
    assert_eq!(all.to_string(), format!("3 '{}'\n", title(3)));

    let value = engine.select(Projection::Value, "indexed", &conditions).unwrap();
    assert_eq!(value.to_string(), format!("{}\n", title(3)));

    let count = engine.select(Projection::Count, "indexed", &conditions).unwrap();
    assert!(count.tuples.is_empty());
    assert_eq!(count.to_string(), "1\n");
}

#[test]
fn test_invalid_key_literal() {
    let (engine, _dir) = setup();
    let result = engine.select(
        Projection::Key,
        "indexed",
        &[Condition::new(Attr::Key, CompOp::Gt, "ten")],
    );
    assert!(matches!(result, Err(Error::InvalidCondition(_))));
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let engine = QueryEngine::new(dir.path());
    let result = engine.load("t", dir.path().join("absent.del"), false);
    assert!(matches!(result, Err(Error::Open { .. })));
}

#[test]
fn test_load_skips_overlong_values() {
    let dir = tempdir().unwrap();
    let load_file = dir.path().join("t.del");
    let long = "x".repeat(pageidx::MAX_VALUE_LENGTH + 1);
    fs::write(&load_file, format!("1, ok\n2, {}\n3, fine\n", long)).unwrap();

    let engine = QueryEngine::new(dir.path());
    let summary = engine.load("t", &load_file, true).unwrap();
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.skipped, 1);

    let result = engine.select(Projection::Key, "t", &[Condition::key(CompOp::Ge, 0)]).unwrap();
    assert_eq!(result.keys(), vec![1, 3]);
}

#[test]
fn test_load_skips_lines_that_are_not_utf8() {
    let dir = tempdir().unwrap();
    let load_file = dir.path().join("t.del");
    let mut bytes = b"1,'a'\n2,'b'\n3,'".to_vec();
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    bytes.extend_from_slice(b"'\n4,'d'\n");
    fs::write(&load_file, bytes).unwrap();

    let engine = QueryEngine::new(dir.path());
    let summary = engine.load("t", &load_file, true).unwrap();
    assert_eq!(summary.loaded, 3);
    assert_eq!(summary.skipped, 1);

    let scanned = engine.select(Projection::Count, "t", &[]).unwrap();
    let indexed = engine
        .select(Projection::Key, "t", &[Condition::key(CompOp::Ge, 0)])
        .unwrap();
    assert_eq!(scanned.count, 3);
    assert!(indexed.used_index);
    assert_eq!(indexed.keys(), vec![1, 2, 4]);
}

#[test]
fn test_failed_load_leaves_index_in_step_with_table() {
    let dir = tempdir().unwrap();
    let load_file = dir.path().join("t.del");
    fs::write(&load_file, "1, one\n2, two\n").unwrap();

    let engine = QueryEngine::new(dir.path());
    engine.load("t", &load_file, true).unwrap();

    // A directory opens but cannot be read, so the load fails after both
    // table files are open.
    let unreadable = dir.path().join("not_a_file");
    fs::create_dir(&unreadable).unwrap();
    assert!(matches!(engine.load("t", &unreadable, true), Err(Error::Io(_))));

    let scanned = engine.select(Projection::Key, "t", &[]).unwrap();
    let indexed = engine
        .select(Projection::Key, "t", &[Condition::key(CompOp::Ge, 0)])
        .unwrap();
    assert!(indexed.used_index);
    assert_eq!(scanned.keys(), vec![1, 2]);
    assert_eq!(indexed.keys(), vec![1, 2]);
}
