//! Shared fixtures for writer integration tests
#![allow(dead_code)]

use std::sync::Arc;

use kvingest::adapter::{AdapterEncoding, DataAdapter, IndexDependent, RowMerging};
use kvingest::backend::{IteratorSetting, MemoryBackend};
use kvingest::catalog::MemoryCatalog;
use kvingest::index::{PrimaryIndex, SortedKeyIndex};
use kvingest::setup_cache::SetupCacheRegistry;
use kvingest::statistics::MemoryStatisticsStore;
use kvingest::{ByteArrayId, IndexWriter, StoreServices, WriterOptions};

/// Test entity: an id, the index keys it lands on, and one named field
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub keys: Vec<String>,
    pub name: String,
}

pub fn feature(id: &str, keys: &[&str]) -> Feature {
    Feature {
        id: id.to_string(),
        keys: keys.iter().map(|k| k.to_string()).collect(),
        name: format!("feature {}", id),
    }
}

fn encode_feature(feature: &Feature) -> AdapterEncoding {
    AdapterEncoding::new(ByteArrayId::from_str(&feature.id))
        .with_insertion_keys(feature.keys.iter().map(|k| k.as_bytes().to_vec()).collect())
        .with_field("name", feature.name.as_bytes())
}

/// Plain adapter: no optional capabilities
pub struct FeatureAdapter {
    id: ByteArrayId,
}

impl FeatureAdapter {
    pub fn new(id: &str) -> Self {
        Self {
            id: ByteArrayId::from_str(id),
        }
    }
}

impl DataAdapter<Feature> for FeatureAdapter {
    fn adapter_id(&self) -> &ByteArrayId {
        &self.id
    }

    fn encode(&self, _index: &dyn PrimaryIndex, entry: &Feature) -> AdapterEncoding {
        encode_feature(entry)
    }
}

/// Adapter whose rows need a server-side combiner
pub struct MergingAdapter {
    id: ByteArrayId,
}

impl MergingAdapter {
    pub fn new(id: &str) -> Self {
        Self {
            id: ByteArrayId::from_str(id),
        }
    }
}

impl DataAdapter<Feature> for MergingAdapter {
    fn adapter_id(&self) -> &ByteArrayId {
        &self.id
    }

    fn encode(&self, _index: &dyn PrimaryIndex, entry: &Feature) -> AdapterEncoding {
        encode_feature(entry)
    }

    fn row_merging(&self) -> Option<&dyn RowMerging> {
        Some(self)
    }
}

impl RowMerging for MergingAdapter {
    fn merging_iterators(&self) -> Vec<IteratorSetting> {
        vec![
            IteratorSetting::new("combiner", 10, "kvingest.SumCombiner").with_option("columns", "name"),
        ]
    }
}

/// Splits a feature into one derived feature per key, e.g. per tile
pub struct TiledAdapter {
    id: ByteArrayId,
}

impl TiledAdapter {
    pub fn new(id: &str) -> Self {
        Self {
            id: ByteArrayId::from_str(id),
        }
    }
}

impl DataAdapter<Feature> for TiledAdapter {
    fn adapter_id(&self) -> &ByteArrayId {
        &self.id
    }

    fn encode(&self, _index: &dyn PrimaryIndex, entry: &Feature) -> AdapterEncoding {
        encode_feature(entry)
    }

    fn index_dependent(&self) -> Option<&dyn IndexDependent<Feature>> {
        Some(self)
    }
}

impl IndexDependent<Feature> for TiledAdapter {
    fn convert_to_index<'a>(
        &'a self,
        _index: &'a dyn PrimaryIndex,
        entry: &'a Feature,
    ) -> Box<dyn Iterator<Item = Feature> + 'a> {
        Box::new(entry.keys.iter().enumerate().map(move |(i, key)| Feature {
            id: format!("{}#{}", entry.id, i),
            keys: vec![key.clone()],
            name: entry.name.clone(),
        }))
    }
}

/// In-memory collaborators, kept concrete so tests can inspect them
pub struct TestStore {
    pub backend: MemoryBackend,
    pub catalog: Arc<MemoryCatalog>,
    pub statistics: Arc<MemoryStatisticsStore>,
    pub caches: Arc<SetupCacheRegistry>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    pub fn with_backend(backend: MemoryBackend) -> Self {
        Self {
            backend,
            catalog: Arc::new(MemoryCatalog::new()),
            statistics: Arc::new(MemoryStatisticsStore::new()),
            caches: Arc::new(SetupCacheRegistry::new()),
        }
    }

    pub fn services(&self) -> StoreServices {
        StoreServices::new(
            Arc::new(self.backend.clone()),
            self.catalog.clone(),
            self.statistics.clone(),
            self.caches.clone(),
        )
    }

    /// Writer on a `SortedKeyIndex`; the skip-flush toggle is pinned off
    /// unless the options set it, so the environment cannot leak in.
    pub fn writer(&self, index: &str, mut options: WriterOptions) -> IndexWriter {
        if options.skip_stats_flush.is_none() {
            options.skip_stats_flush = Some(false);
        }
        IndexWriter::new(Arc::new(SortedKeyIndex::new(index)), self.services(), options)
    }
}
