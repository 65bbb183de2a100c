//! Statistics composition
//!
//! Each index writer accumulates, per adapter, running statistics over the
//! entities it writes and periodically hands them to a shared statistics
//! store. Accumulators are fixed-size aggregates, so memory depends on the
//! number of adapters, never on the number of entities.
//!
//! # Flush protocol
//!
//! - One write counter per writer, shared by all adapters
//! - Counter reaching the threshold flushes every adapter and resets it
//! - Explicit flush/close flush everything regardless of the counter
//! - Flushing with nothing accumulated persists nothing

mod buffer;
mod errors;
mod store;
mod tool;
mod values;

pub(crate) use buffer::StatisticsBuffer;
pub use buffer::DEFAULT_FLUSH_THRESHOLD;
pub use errors::{StatisticsError, StatisticsResult};
pub use store::{AdapterStatistics, MemoryStatisticsStore, StatisticsStore};
pub use tool::StatsCompositionTool;
pub use values::{
    CountStatistics, DataStatistics, RowRangeStatistics, StatisticsValue, COUNT_STATISTICS_ID,
    ROW_RANGE_STATISTICS_ID,
};
