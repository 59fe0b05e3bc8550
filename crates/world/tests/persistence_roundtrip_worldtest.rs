//! Persistence Roundtrip Worldtest
//!
//! Saves generated structures and legacy indices to a structure directory
//! and reads them back.
//! Focus areas:
//! - Every family survives a save with identical pieces and fingerprint
//! - A bad piece fails its whole start on strict load
//! - Lenient loads drop only the bad start
//! - Legacy indices survive and damaged files read as empty

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use structgen_core::ChunkPos;
use structgen_testkit::{
    fingerprint_structure, MetricsReportBuilder, MetricsSink, PersistenceMetrics, TestResult,
};
use structgen_world::{
    decode_starts_lenient, generate_structure, BuiltinTemplates, DecodeError, GenerationConfig,
    LegacyStructureHandler, Record, StructureFamily, StructureStart, StructureStore, Tag,
    TemplateLibrary,
};

fn temp_dir(name: &str) -> PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    env::temp_dir().join(format!("structgen_{name}_{timestamp}"))
}

fn one_of_each(seed: u64) -> Vec<StructureStart> {
    let config = GenerationConfig::default();
    let templates: Arc<dyn TemplateLibrary> = Arc::new(BuiltinTemplates::new());
    StructureFamily::ALL
        .into_iter()
        .enumerate()
        .filter_map(|(i, family)| {
            generate_structure(family, &config, templates.clone(), seed, ChunkPos::new(i as i32 * 8, -4))
        })
        .collect()
}

/// Rename the first child of `record` to an id no piece uses.
fn break_first_child(record: &mut Record) {
    let mut children = record.get_list("Children").unwrap().to_vec();
    let Some(Tag::Compound(child)) = children.first_mut() else {
        panic!("start without children");
    };
    child.put_string("id", "NoSuchPiece");
    record.put_list("Children", children);
}

#[test]
fn persistence_roundtrip_worldtest() {
    let dir = temp_dir("roundtrip");
    let store = StructureStore::new(&dir).unwrap();

    let mut starts = one_of_each(99);
    assert!(starts.len() >= 4);
    starts[0].add_reference();
    starts[0].add_reference();

    store.save_starts(&starts).unwrap();
    let bytes_written = fs::metadata(store.starts_path()).unwrap().len();
    let loaded = store.load_starts().unwrap();

    assert_eq!(loaded, starts);
    assert_eq!(loaded[0].references(), 2);
    for (a, b) in loaded.iter().zip(&starts) {
        assert_eq!(fingerprint_structure(a), fingerprint_structure(b));
    }

    let report = MetricsReportBuilder::new("persistence_roundtrip_worldtest")
        .result(TestResult::Pass)
        .persistence(PersistenceMetrics {
            starts_saved: starts.len(),
            starts_loaded: loaded.len(),
            bytes_written,
        })
        .build();
    MetricsSink::create("target/metrics/persistence_roundtrip_worldtest.json")
        .unwrap()
        .write(&report)
        .unwrap();

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn bad_child_fails_its_start_only() {
    let starts = one_of_each(7);
    let mut records: Vec<Record> = starts.iter().map(StructureStart::to_record).collect();
    break_first_child(&mut records[1]);

    assert_eq!(
        StructureStart::from_record(&records[1]),
        Err(DecodeError::UnknownPiece("NoSuchPiece".to_string()))
    );

    let decoded = decode_starts_lenient(&records);
    assert_eq!(decoded.len(), starts.len() - 1);
    assert_eq!(decoded[0], starts[0]);
    assert_eq!(&decoded[1..], &starts[2..]);
}

#[test]
fn strict_load_names_the_bad_start() {
    let dir = temp_dir("strict");
    let store = StructureStore::new(&dir).unwrap();
    let starts = one_of_each(3);
    store.save_starts(&starts).unwrap();

    // Rewrite the blob with one damaged start through the public encoder.
    let mut records: Vec<Record> = starts.iter().map(StructureStart::to_record).collect();
    break_first_child(&mut records[2]);
    fs::write(
        store.starts_path(),
        structgen_world::persist::encode_blob(&records).unwrap(),
    )
    .unwrap();

    let err = store.load_starts().unwrap_err();
    assert!(format!("{err:#}").contains("structure start 2"), "{err:#}");
    assert_eq!(store.load_starts_lenient().len(), starts.len() - 1);

    fs::write(store.starts_path(), b"not a blob").unwrap();
    assert!(store.load_starts().is_err());
    assert!(store.load_starts_lenient().is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn legacy_indices_survive_and_track_migration() {
    let dir = temp_dir("legacy");
    let store = StructureStore::new(&dir).unwrap();
    let starts = one_of_each(11);

    let mut handler = LegacyStructureHandler::new();
    for start in &starts {
        handler.record_start(start);
    }
    let first = &starts[0];
    handler.mark_handled(first.family(), first.chunk());
    store.save_legacy(&handler).unwrap();

    let loaded = store.load_legacy_lenient();
    assert_eq!(loaded, handler);
    assert!(!loaded.is_unhandled_start(first.family(), first.chunk()));
    assert!(loaded
        .index(first.family())
        .is_some_and(|index| index.has_start_index(first.chunk().pack())));
    for start in &starts[1..] {
        assert_eq!(loaded.unhandled_families(start.chunk()), vec![start.family()]);
    }

    let mut bytes = fs::read(store.legacy_path()).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x5A;
    fs::write(store.legacy_path(), bytes).unwrap();
    assert_eq!(store.load_legacy_lenient(), LegacyStructureHandler::new());

    fs::remove_dir_all(&dir).ok();
}
