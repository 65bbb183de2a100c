//! Index error types
//!
//! Error codes:
//! - KVI_MALFORMED_ROW_ID (ERROR)

use std::fmt;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, writer continues
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Row id too short or its length trailer is inconsistent
    KviMalformedRowId,
}

impl IndexErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::KviMalformedRowId => "KVI_MALFORMED_ROW_ID",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
}

impl IndexError {
    pub fn malformed_row_id(len: usize, reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::KviMalformedRowId,
            message: format!("row id of {} bytes: {}", len, reason.into()),
        }
    }

    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
