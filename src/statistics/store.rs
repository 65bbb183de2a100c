//! Statistics persistence

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StatisticsError, StatisticsResult};
use super::values::StatisticsValue;
use crate::types::ByteArrayId;

/// Everything one adapter accumulated in one writer between two flushes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterStatistics {
    pub adapter_id: ByteArrayId,
    pub index_id: ByteArrayId,
    pub entries_ingested: u64,
    /// statistics id -> value
    pub values: BTreeMap<String, StatisticsValue>,
    pub flushed_at: DateTime<Utc>,
}

/// Receives flushed statistics; shared by many writers
pub trait StatisticsStore: Send + Sync {
    fn persist(&self, statistics: AdapterStatistics) -> StatisticsResult<()>;
}

type MergedKey = (ByteArrayId, ByteArrayId, String);

/// In-memory statistics store.
///
/// Keeps every persisted record in arrival order and a merged view per
/// (adapter, index, statistics id).
#[derive(Debug, Default)]
pub struct MemoryStatisticsStore {
    history: Mutex<Vec<AdapterStatistics>>,
    merged: Mutex<BTreeMap<MergedKey, StatisticsValue>>,
    /// Remaining persists to reject
    failures: Mutex<u32>,
}

fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` persist calls
    pub fn fail_next(&self, count: u32) {
        *lock_recover(&self.failures) = count;
    }

    /// Every accepted record, oldest first
    pub fn persisted(&self) -> Vec<AdapterStatistics> {
        lock_recover(&self.history).clone()
    }

    pub fn persist_count(&self) -> usize {
        lock_recover(&self.history).len()
    }

    pub fn persisted_for(&self, adapter_id: &ByteArrayId) -> Vec<AdapterStatistics> {
        lock_recover(&self.history)
            .iter()
            .filter(|s| &s.adapter_id == adapter_id)
            .cloned()
            .collect()
    }

    /// Merged value of one statistic across every accepted record
    pub fn merged(
        &self,
        adapter_id: &ByteArrayId,
        index_id: &ByteArrayId,
        statistics_id: &str,
    ) -> Option<StatisticsValue> {
        lock_recover(&self.merged)
            .get(&(adapter_id.clone(), index_id.clone(), statistics_id.to_string()))
            .cloned()
    }
}

impl StatisticsStore for MemoryStatisticsStore {
    fn persist(&self, statistics: AdapterStatistics) -> StatisticsResult<()> {
        {
            let mut failures = lock_recover(&self.failures);
            if *failures > 0 {
                *failures -= 1;
                return Err(StatisticsError::Rejected {
                    adapter_id: statistics.adapter_id,
                    reason: "injected failure".to_string(),
                });
            }
        }

        let mut merged = self
            .merged
            .lock()
            .map_err(|_| StatisticsError::Poisoned("merged statistics".to_string()))?;
        for (statistics_id, value) in &statistics.values {
            let key = (
                statistics.adapter_id.clone(),
                statistics.index_id.clone(),
                statistics_id.clone(),
            );
            match merged.get_mut(&key) {
                Some(existing) => existing.merge(value),
                None => {
                    merged.insert(key, value.clone());
                }
            }
        }
        drop(merged);

        self.history
            .lock()
            .map_err(|_| StatisticsError::Poisoned("statistics history".to_string()))?
            .push(statistics);
        Ok(())
    }
}
