//! Catalog of known adapters and indexes
//!
//! Writers register every adapter and index they write through. Both
//! registrations are idempotent upserts and are repeated on every write.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::DataAdapter;
use crate::index::PrimaryIndex;
use crate::types::ByteArrayId;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("catalog state poisoned: {0}")]
    Poisoned(String),
}

/// What the catalog knows about an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterRecord {
    pub adapter_id: ByteArrayId,
    pub index_dependent: bool,
    pub row_merging: bool,
}

impl AdapterRecord {
    pub fn from_adapter<T: 'static>(adapter: &dyn DataAdapter<T>) -> Self {
        Self {
            adapter_id: adapter.adapter_id().clone(),
            index_dependent: adapter.index_dependent().is_some(),
            row_merging: adapter.row_merging().is_some(),
        }
    }
}

/// What the catalog knows about an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub index_id: ByteArrayId,
    pub table_name: String,
}

impl IndexRecord {
    pub fn from_index(index: &dyn PrimaryIndex) -> Self {
        Self {
            index_id: index.id().clone(),
            table_name: index.table_name(),
        }
    }
}

/// Store of adapter and index definitions; shared by many writers
pub trait Catalog: Send + Sync {
    fn store_adapter(&self, record: &AdapterRecord) -> CatalogResult<()>;

    fn store_index(&self, record: &IndexRecord) -> CatalogResult<()>;
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    adapters: Mutex<BTreeMap<ByteArrayId, AdapterRecord>>,
    indexes: Mutex<BTreeMap<ByteArrayId, IndexRecord>>,
    /// Total upsert calls, repeats included
    upserts: Mutex<u64>,
    fail_next: Mutex<bool>,
}

fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next upsert
    pub fn fail_next(&self) {
        *lock_recover(&self.fail_next) = true;
    }

    pub fn adapters(&self) -> Vec<AdapterRecord> {
        lock_recover(&self.adapters).values().cloned().collect()
    }

    pub fn indexes(&self) -> Vec<IndexRecord> {
        lock_recover(&self.indexes).values().cloned().collect()
    }

    pub fn upsert_count(&self) -> u64 {
        *lock_recover(&self.upserts)
    }

    fn begin_upsert(&self) -> CatalogResult<()> {
        *lock_recover(&self.upserts) += 1;
        let mut fail = lock_recover(&self.fail_next);
        if *fail {
            *fail = false;
            return Err(CatalogError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    fn store_adapter(&self, record: &AdapterRecord) -> CatalogResult<()> {
        self.begin_upsert()?;
        self.adapters
            .lock()
            .map_err(|_| CatalogError::Poisoned("adapters".to_string()))?
            .insert(record.adapter_id.clone(), record.clone());
        Ok(())
    }

    fn store_index(&self, record: &IndexRecord) -> CatalogResult<()> {
        self.begin_upsert()?;
        self.indexes
            .lock()
            .map_err(|_| CatalogError::Poisoned("indexes".to_string()))?
            .insert(record.index_id.clone(), record.clone());
        Ok(())
    }
}
