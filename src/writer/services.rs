//! Shared collaborators handed to every index writer

use std::sync::Arc;

use crate::backend::BackendOperations;
use crate::catalog::Catalog;
use crate::setup_cache::SetupCacheRegistry;
use crate::statistics::StatisticsStore;

/// Everything a writer shares with other writers in the process.
///
/// All members are assumed safe for concurrent use. Writers that should
/// deduplicate administrative setup must share the same `setup_caches`.
#[derive(Clone)]
pub struct StoreServices {
    pub backend: Arc<dyn BackendOperations>,
    pub catalog: Arc<dyn Catalog>,
    pub statistics: Arc<dyn StatisticsStore>,
    pub setup_caches: Arc<SetupCacheRegistry>,
}

impl StoreServices {
    pub fn new(
        backend: Arc<dyn BackendOperations>,
        catalog: Arc<dyn Catalog>,
        statistics: Arc<dyn StatisticsStore>,
        setup_caches: Arc<SetupCacheRegistry>,
    ) -> Self {
        Self {
            backend,
            catalog,
            statistics,
            setup_caches,
        }
    }
}
