//! Adapter abstraction
//!
//! One trait covers every adapter shape. The shapes that change how an
//! entity is written are exposed as optional capabilities, and the index
//! writer branches on them explicitly:
//!
//! - `index_dependent()`: the entity expands into derived entities per index
//! - `row_merging()`: rows need server-side merging iterators on the table

use super::encoding::AdapterEncoding;
use crate::backend::IteratorSetting;
use crate::index::PrimaryIndex;
use crate::statistics::{CountStatistics, DataStatistics, RowRangeStatistics};
use crate::types::ByteArrayId;

/// Knows how to encode entities of type `T` for an index
pub trait DataAdapter<T>: Send + Sync
where
    T: 'static,
{
    fn adapter_id(&self) -> &ByteArrayId;

    fn encode(&self, index: &dyn PrimaryIndex, entry: &T) -> AdapterEncoding;

    /// Fresh statistics for one accumulation period
    fn create_statistics(&self, _index: &dyn PrimaryIndex) -> Vec<Box<dyn DataStatistics<T>>> {
        vec![
            Box::new(CountStatistics::new()),
            Box::new(RowRangeStatistics::new()),
        ]
    }

    fn index_dependent(&self) -> Option<&dyn IndexDependent<T>> {
        None
    }

    fn row_merging(&self) -> Option<&dyn RowMerging> {
        None
    }
}

/// Expands one input entity into the derived entities written to an index,
/// for example one per index cell it overlaps.
pub trait IndexDependent<T>: Send + Sync {
    /// Lazy and finite; derived entities are written in iteration order
    fn convert_to_index<'a>(
        &'a self,
        index: &'a dyn PrimaryIndex,
        entry: &'a T,
    ) -> Box<dyn Iterator<Item = T> + 'a>;
}

/// Rows that the backend must merge server-side on scan and compaction
pub trait RowMerging: Send + Sync {
    fn merging_iterators(&self) -> Vec<IteratorSetting>;
}
