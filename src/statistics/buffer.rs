//! Per-writer statistics accumulators and the flush threshold

use std::collections::BTreeMap;

use super::errors::{StatisticsError, StatisticsResult};
use super::store::StatisticsStore;
use super::tool::{ErasedStatsTool, StatsCompositionTool};
use crate::adapter::{DataAdapter, EntryInfo};
use crate::index::PrimaryIndex;
use crate::types::ByteArrayId;

/// Entries recorded before every accumulator is flushed.
///
/// Bounds memory and flush cost; has no meaning for the statistics themselves.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 16384;

/// Outcome of one flush pass
#[derive(Debug, Default)]
pub(crate) struct FlushReport {
    pub persisted: Vec<ByteArrayId>,
    pub failed: Vec<(ByteArrayId, StatisticsError)>,
}

impl FlushReport {
    /// First failure, if any
    pub fn into_result(self) -> StatisticsResult<usize> {
        match self.failed.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(self.persisted.len()),
        }
    }
}

/// Accumulators keyed by adapter id, plus one write counter shared by all
/// of them. Reaching the threshold flushes every adapter, not just the
/// one that tipped it over.
pub(crate) struct StatisticsBuffer {
    tools: BTreeMap<ByteArrayId, Box<dyn ErasedStatsTool>>,
    writes_since_flush: usize,
    threshold: usize,
    skip_threshold: bool,
}

impl StatisticsBuffer {
    pub fn new(threshold: usize, skip_threshold: bool) -> Self {
        Self {
            tools: BTreeMap::new(),
            writes_since_flush: 0,
            threshold,
            skip_threshold,
        }
    }

    /// Fails when `adapter_id` already accumulates for a different entity type
    pub fn ensure_compatible<T: 'static>(&self, adapter_id: &ByteArrayId) -> StatisticsResult<()> {
        match self.tools.get(adapter_id) {
            Some(tool) if !tool.as_any().is::<StatsCompositionTool<T>>() => {
                Err(StatisticsError::TypeMismatch(adapter_id.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Record one written entity. Returns true when a flush is due.
    pub fn record<T: 'static>(
        &mut self,
        adapter: &dyn DataAdapter<T>,
        index: &dyn PrimaryIndex,
        info: &EntryInfo,
        entry: &T,
    ) -> StatisticsResult<bool> {
        let adapter_id = adapter.adapter_id();
        let tool = self
            .tools
            .entry(adapter_id.clone())
            .or_insert_with(|| -> Box<dyn ErasedStatsTool> {
                Box::new(StatsCompositionTool::new(
                    adapter_id.clone(),
                    index.id().clone(),
                    adapter.create_statistics(index),
                ))
            });
        let tool = tool
            .as_any_mut()
            .downcast_mut::<StatsCompositionTool<T>>()
            .ok_or_else(|| StatisticsError::TypeMismatch(adapter_id.clone()))?;

        tool.entry_ingested(info, entry);
        self.writes_since_flush += 1;

        Ok(!self.skip_threshold && self.writes_since_flush >= self.threshold)
    }

    /// Hand every accumulator to the store and drop it. Accumulators the
    /// store rejects are kept for the next pass. Resets the write counter.
    pub fn flush_all(&mut self, store: &dyn StatisticsStore) -> FlushReport {
        self.writes_since_flush = 0;

        let mut report = FlushReport::default();
        let mut retained = BTreeMap::new();
        for (adapter_id, tool) in std::mem::take(&mut self.tools) {
            match tool.flush_into(store) {
                Ok(()) => report.persisted.push(adapter_id),
                Err(err) => {
                    report.failed.push((adapter_id.clone(), err));
                    retained.insert(adapter_id, tool);
                }
            }
        }
        self.tools = retained;
        report
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn writes_since_flush(&self) -> usize {
        self.writes_since_flush
    }

    /// Adapter id -> entries accumulated since its last flush
    pub fn pending(&self) -> BTreeMap<ByteArrayId, u64> {
        self.tools
            .iter()
            .map(|(id, tool)| (id.clone(), tool.entries_ingested()))
            .collect()
    }
}
