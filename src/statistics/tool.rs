//! Per-adapter statistics accumulation

use std::any::Any;
use std::collections::BTreeMap;

use chrono::Utc;

use super::errors::StatisticsResult;
use super::store::{AdapterStatistics, StatisticsStore};
use super::values::DataStatistics;
use crate::adapter::EntryInfo;
use crate::types::ByteArrayId;

/// Running statistics for one adapter on one index.
///
/// Lives from the first entity of its adapter until the next flush; the
/// next entity after a flush gets a fresh tool.
pub struct StatsCompositionTool<T> {
    adapter_id: ByteArrayId,
    index_id: ByteArrayId,
    statistics: Vec<Box<dyn DataStatistics<T>>>,
    entries_ingested: u64,
}

impl<T> StatsCompositionTool<T> {
    pub fn new(
        adapter_id: ByteArrayId,
        index_id: ByteArrayId,
        statistics: Vec<Box<dyn DataStatistics<T>>>,
    ) -> Self {
        Self {
            adapter_id,
            index_id,
            statistics,
            entries_ingested: 0,
        }
    }

    pub fn adapter_id(&self) -> &ByteArrayId {
        &self.adapter_id
    }

    pub fn entries_ingested(&self) -> u64 {
        self.entries_ingested
    }

    pub fn entry_ingested(&mut self, info: &EntryInfo, entry: &T) {
        for stat in &mut self.statistics {
            stat.entry_ingested(info, entry);
        }
        self.entries_ingested += 1;
    }

    /// Snapshot of the current state, stamped now
    pub fn to_record(&self) -> AdapterStatistics {
        let values: BTreeMap<_, _> = self
            .statistics
            .iter()
            .map(|s| (s.statistics_id().to_string(), s.value()))
            .collect();
        AdapterStatistics {
            adapter_id: self.adapter_id.clone(),
            index_id: self.index_id.clone(),
            entries_ingested: self.entries_ingested,
            values,
            flushed_at: Utc::now(),
        }
    }

    pub fn flush(&self, store: &dyn StatisticsStore) -> StatisticsResult<()> {
        store.persist(self.to_record())
    }
}

/// Type-erased view so one writer can hold tools for many entity types
pub(crate) trait ErasedStatsTool: Send {
    fn entries_ingested(&self) -> u64;

    fn flush_into(&self, store: &dyn StatisticsStore) -> StatisticsResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedStatsTool for StatsCompositionTool<T> {
    fn entries_ingested(&self) -> u64 {
        self.entries_ingested
    }

    fn flush_into(&self, store: &dyn StatisticsStore) -> StatisticsResult<()> {
        self.flush(store)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterEncoding;
    use crate::statistics::{CountStatistics, MemoryStatisticsStore, StatisticsValue};

    #[test]
    fn test_tool_accumulates_and_flushes() {
        let mut tool: StatsCompositionTool<String> = StatsCompositionTool::new(
            ByteArrayId::from_str("roads"),
            ByteArrayId::from_str("idx"),
            vec![Box::new(CountStatistics::new())],
        );
        let info = EntryInfo::new(
            ByteArrayId::from_str("roads"),
            vec![ByteArrayId::from_str("r1"), ByteArrayId::from_str("r2")],
            AdapterEncoding::new(ByteArrayId::from_str("e1")),
        );
        tool.entry_ingested(&info, &"e1".to_string());
        tool.entry_ingested(&info, &"e1".to_string());

        let store = MemoryStatisticsStore::new();
        tool.flush(&store).unwrap();

        let persisted = store.persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].entries_ingested, 2);
        assert_eq!(
            persisted[0].values.get("COUNT_DATA"),
            Some(&StatisticsValue::Count { entries: 2, rows: 4 })
        );
    }

    #[test]
    fn test_erased_downcast() {
        let mut tool: Box<dyn ErasedStatsTool> = Box::new(StatsCompositionTool::<u32>::new(
            ByteArrayId::from_str("a"),
            ByteArrayId::from_str("idx"),
            Vec::new(),
        ));
        assert!(tool.as_any().is::<StatsCompositionTool<u32>>());
        assert!(tool
            .as_any_mut()
            .downcast_mut::<StatsCompositionTool<String>>()
            .is_none());
    }
}
