//! Index-Dependent Adapter Tests
//!
//! Tests for adapters that expand an entity per index before writing.

mod common;

use common::{feature, FeatureAdapter, TestStore, TiledAdapter};
use kvingest::backend::BackendOp;
use kvingest::index::RowId;
use kvingest::statistics::{StatisticsValue, COUNT_STATISTICS_ID};
use kvingest::{ByteArrayId, WriterOptions};

/// Each derived entity is written; row ids are concatenated in order.
#[test]
fn test_derived_entities_written_in_order() {
    let store = TestStore::new();
    let writer = store.writer("tiles", WriterOptions::default().with_alt_index(true));

    let ids = writer
        .write(&TiledAdapter::new("tiled"), &feature("road", &["t0", "t1", "t2"]))
        .unwrap();
    assert_eq!(ids.len(), 3);

    let data_ids: Vec<_> = ids
        .iter()
        .map(|id| RowId::decode(id).unwrap().data_id)
        .collect();
    assert_eq!(
        data_ids,
        vec![
            ByteArrayId::from_str("road#0"),
            ByteArrayId::from_str("road#1"),
            ByteArrayId::from_str("road#2"),
        ]
    );

    writer.close().unwrap();
    assert_eq!(
        store.backend.lookup_alternate("tiles_ALT_INDEX", b"road#1").unwrap(),
        vec![ids[1].clone()]
    );
}

/// Statistics count derived entities, not inputs.
#[test]
fn test_statistics_count_derived_entities() {
    let store = TestStore::new();
    let writer = store.writer("tiles", WriterOptions::default());
    let adapter = TiledAdapter::new("tiled");

    writer.write(&adapter, &feature("a", &["t0", "t1"])).unwrap();
    writer.write(&adapter, &feature("b", &["t2"])).unwrap();
    writer.close().unwrap();

    assert_eq!(
        store.statistics.merged(
            &ByteArrayId::from_str("tiled"),
            &ByteArrayId::from_str("tiles"),
            COUNT_STATISTICS_ID,
        ),
        Some(StatisticsValue::Count { entries: 3, rows: 3 })
    );
    assert_eq!(writer.metrics().entries_written, 3);
}

/// No derived entities: nothing is opened or written.
#[test]
fn test_no_derived_entities_writes_nothing() {
    let store = TestStore::new();
    let writer = store.writer("tiles", WriterOptions::default());

    let ids = writer
        .write(&TiledAdapter::new("tiled"), &feature("empty", &[]))
        .unwrap();
    assert!(ids.is_empty());
    assert_eq!(store.backend.counts().get(BackendOp::CreateWriteHandle), 0);
    assert!(store.catalog.adapters().is_empty());
}

/// The catalog records the adapter as index-dependent.
#[test]
fn test_catalog_marks_index_dependent() {
    let store = TestStore::new();
    let writer = store.writer("tiles", WriterOptions::default());
    writer
        .write(&TiledAdapter::new("tiled"), &feature("road", &["t0"]))
        .unwrap();
    writer
        .write(&FeatureAdapter::new("plain"), &feature("house", &["t0"]))
        .unwrap();

    let adapters = store.catalog.adapters();
    let tiled = adapters
        .iter()
        .find(|a| a.adapter_id == ByteArrayId::from_str("tiled"))
        .unwrap();
    let plain = adapters
        .iter()
        .find(|a| a.adapter_id == ByteArrayId::from_str("plain"))
        .unwrap();
    assert!(tiled.index_dependent);
    assert!(!plain.index_dependent);
}
