//! Statistics errors

use thiserror::Error;

use crate::types::ByteArrayId;

/// Result type for statistics operations
pub type StatisticsResult<T> = Result<T, StatisticsError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatisticsError {
    /// Store refused the record
    #[error("statistics rejected for adapter {adapter_id}: {reason}")]
    Rejected { adapter_id: ByteArrayId, reason: String },

    /// Store could not be reached
    #[error("statistics store unavailable: {0}")]
    Unavailable(String),

    /// An adapter id was reused for a different entity type within one writer
    #[error("adapter {0} already accumulating statistics for a different entity type")]
    TypeMismatch(ByteArrayId),

    #[error("statistics state poisoned: {0}")]
    Poisoned(String),
}
