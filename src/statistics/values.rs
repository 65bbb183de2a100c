//! Statistic values and the built-in statistics

use serde::{Deserialize, Serialize};

use crate::adapter::EntryInfo;

/// Serializable state of one statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatisticsValue {
    Count {
        entries: u64,
        rows: u64,
    },
    RowRange {
        min: Option<Vec<u8>>,
        max: Option<Vec<u8>>,
    },
    Custom {
        value: serde_json::Value,
    },
}

impl StatisticsValue {
    /// Fold a later value of the same statistic into this one.
    ///
    /// Counts add, ranges widen; anything else takes the later value.
    pub fn merge(&mut self, other: &StatisticsValue) {
        match (self, other) {
            (
                StatisticsValue::Count { entries, rows },
                StatisticsValue::Count {
                    entries: other_entries,
                    rows: other_rows,
                },
            ) => {
                *entries += other_entries;
                *rows += other_rows;
            }
            (
                StatisticsValue::RowRange { min, max },
                StatisticsValue::RowRange {
                    min: other_min,
                    max: other_max,
                },
            ) => {
                widen_min(min, other_min.as_deref());
                widen_max(max, other_max.as_deref());
            }
            (current, later) => *current = later.clone(),
        }
    }
}

fn widen_min(current: &mut Option<Vec<u8>>, candidate: Option<&[u8]>) {
    if let Some(c) = candidate {
        if current.as_deref().map_or(true, |m| c < m) {
            *current = Some(c.to_vec());
        }
    }
}

fn widen_max(current: &mut Option<Vec<u8>>, candidate: Option<&[u8]>) {
    if let Some(c) = candidate {
        if current.as_deref().map_or(true, |m| c > m) {
            *current = Some(c.to_vec());
        }
    }
}

/// A running aggregate over the entities of one adapter
pub trait DataStatistics<T>: Send {
    fn statistics_id(&self) -> &str;

    fn entry_ingested(&mut self, info: &EntryInfo, entry: &T);

    fn value(&self) -> StatisticsValue;
}

pub const COUNT_STATISTICS_ID: &str = "COUNT_DATA";
pub const ROW_RANGE_STATISTICS_ID: &str = "ROW_RANGE";

/// Entities and primary rows written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountStatistics {
    entries: u64,
    rows: u64,
}

impl CountStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> DataStatistics<T> for CountStatistics {
    fn statistics_id(&self) -> &str {
        COUNT_STATISTICS_ID
    }

    fn entry_ingested(&mut self, info: &EntryInfo, _entry: &T) {
        self.entries += 1;
        self.rows += info.row_ids.len() as u64;
    }

    fn value(&self) -> StatisticsValue {
        StatisticsValue::Count {
            entries: self.entries,
            rows: self.rows,
        }
    }
}

/// Smallest and largest primary row id written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRangeStatistics {
    min: Option<Vec<u8>>,
    max: Option<Vec<u8>>,
}

impl RowRangeStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> DataStatistics<T> for RowRangeStatistics {
    fn statistics_id(&self) -> &str {
        ROW_RANGE_STATISTICS_ID
    }

    fn entry_ingested(&mut self, info: &EntryInfo, _entry: &T) {
        for row_id in &info.row_ids {
            widen_min(&mut self.min, Some(row_id.as_bytes()));
            widen_max(&mut self.max, Some(row_id.as_bytes()));
        }
    }

    fn value(&self) -> StatisticsValue {
        StatisticsValue::RowRange {
            min: self.min.clone(),
            max: self.max.clone(),
        }
    }
}
