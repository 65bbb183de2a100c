//! Index writer error types
//!
//! Error codes:
//! - KVI_HANDLE_OPEN_FAILED (ERROR)
//! - KVI_WRITE_FAILED (ERROR)
//! - KVI_FLUSH_FAILED (ERROR)
//! - KVI_CLOSE_FAILED (ERROR)
//! - KVI_CATALOG_FAILED (ERROR)
//! - KVI_STATISTICS_PERSIST_FAILED (ERROR)
//! - KVI_ADAPTER_TYPE_MISMATCH (ERROR)
//! - KVI_WRITER_CLOSED (ERROR)
//! - KVI_LOCK_POISONED (FATAL)
//! - KVI_SETUP_FAILED (ADVISORY)
//!
//! ERROR and FATAL errors are returned to the caller. ADVISORY errors are
//! never returned from `write`: they describe a skipped optimization and
//! are logged, or reported through `SetupReport`.

use std::fmt;

use crate::backend::BackendError;
use crate::catalog::CatalogError;
use crate::statistics::StatisticsError;
use crate::types::ByteArrayId;

/// Severity levels for writer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Optimization skipped, data unaffected; logged and recovered locally
    Advisory,
    /// Operation fails, writer remains usable
    Error,
    /// Writer state can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Advisory => write!(f, "ADVISORY"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterErrorCode {
    /// Backend refused to open a write handle
    KviHandleOpenFailed,
    /// Rows could not be written
    KviWriteFailed,
    /// Buffered rows could not be flushed
    KviFlushFailed,
    /// Handle failed while closing
    KviCloseFailed,
    /// Adapter or index registration failed
    KviCatalogFailed,
    /// Statistics store rejected accumulated statistics
    KviStatisticsPersistFailed,
    /// Adapter id already in use for another entity type on this writer
    KviAdapterTypeMismatch,
    /// Write attempted after close
    KviWriterClosed,
    /// Writer lock poisoned by a panic in another thread
    KviLockPoisoned,
    /// Administrative setup (iterators, locality group) failed
    KviSetupFailed,
}

impl WriterErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            WriterErrorCode::KviHandleOpenFailed => "KVI_HANDLE_OPEN_FAILED",
            WriterErrorCode::KviWriteFailed => "KVI_WRITE_FAILED",
            WriterErrorCode::KviFlushFailed => "KVI_FLUSH_FAILED",
            WriterErrorCode::KviCloseFailed => "KVI_CLOSE_FAILED",
            WriterErrorCode::KviCatalogFailed => "KVI_CATALOG_FAILED",
            WriterErrorCode::KviStatisticsPersistFailed => "KVI_STATISTICS_PERSIST_FAILED",
            WriterErrorCode::KviAdapterTypeMismatch => "KVI_ADAPTER_TYPE_MISMATCH",
            WriterErrorCode::KviWriterClosed => "KVI_WRITER_CLOSED",
            WriterErrorCode::KviLockPoisoned => "KVI_LOCK_POISONED",
            WriterErrorCode::KviSetupFailed => "KVI_SETUP_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            WriterErrorCode::KviSetupFailed => Severity::Advisory,
            WriterErrorCode::KviLockPoisoned => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for WriterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cause {
    Backend(BackendError),
    Catalog(CatalogError),
    Statistics(StatisticsError),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Backend(e) => write!(f, "{}", e),
            Cause::Catalog(e) => write!(f, "{}", e),
            Cause::Statistics(e) => write!(f, "{}", e),
        }
    }
}

/// Writer error with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterError {
    code: WriterErrorCode,
    message: String,
    cause: Option<Cause>,
}

impl WriterError {
    fn new(code: WriterErrorCode, message: String, cause: Option<Cause>) -> Self {
        Self {
            code,
            message,
            cause,
        }
    }

    pub fn handle_open_failed(table: &str, source: BackendError) -> Self {
        Self::new(
            WriterErrorCode::KviHandleOpenFailed,
            format!("unable to open writer for table {}", table),
            Some(Cause::Backend(source)),
        )
    }

    pub fn write_failed(table: &str, source: BackendError) -> Self {
        Self::new(
            WriterErrorCode::KviWriteFailed,
            format!("unable to write rows to table {}", table),
            Some(Cause::Backend(source)),
        )
    }

    pub fn flush_failed(table: &str, source: BackendError) -> Self {
        Self::new(
            WriterErrorCode::KviFlushFailed,
            format!("unable to flush writer for table {}", table),
            Some(Cause::Backend(source)),
        )
    }

    pub fn close_failed(table: &str, source: BackendError) -> Self {
        Self::new(
            WriterErrorCode::KviCloseFailed,
            format!("unable to close writer for table {}", table),
            Some(Cause::Backend(source)),
        )
    }

    pub fn catalog_failed(source: CatalogError) -> Self {
        Self::new(
            WriterErrorCode::KviCatalogFailed,
            "unable to register adapter or index".to_string(),
            Some(Cause::Catalog(source)),
        )
    }

    /// Type mismatches get their own code; every other statistics error
    /// means persisting failed.
    pub fn statistics_failed(source: StatisticsError) -> Self {
        match source {
            StatisticsError::TypeMismatch(ref adapter_id) => Self::new(
                WriterErrorCode::KviAdapterTypeMismatch,
                format!(
                    "adapter {} already accumulates statistics for another entity type",
                    adapter_id
                ),
                Some(Cause::Statistics(source.clone())),
            ),
            _ => Self::new(
                WriterErrorCode::KviStatisticsPersistFailed,
                "unable to persist statistics".to_string(),
                Some(Cause::Statistics(source)),
            ),
        }
    }

    pub fn writer_closed(table: &str) -> Self {
        Self::new(
            WriterErrorCode::KviWriterClosed,
            format!("writer for table {} is closed", table),
            None,
        )
    }

    pub fn lock_poisoned(table: &str) -> Self {
        Self::new(
            WriterErrorCode::KviLockPoisoned,
            format!("writer state for table {} poisoned by a panicked thread", table),
            None,
        )
    }

    /// `step` names the administrative action, e.g. `add_locality_group`
    pub fn setup_failed(step: &str, adapter_id: &ByteArrayId, source: BackendError) -> Self {
        Self::new(
            WriterErrorCode::KviSetupFailed,
            format!("{} failed for adapter {}", step, adapter_id),
            Some(Cause::Backend(source)),
        )
    }

    pub fn code(&self) -> WriterErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Backend error behind this one, if any
    pub fn backend_error(&self) -> Option<&BackendError> {
        match &self.cause {
            Some(Cause::Backend(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_advisory(&self) -> bool {
        self.severity() == Severity::Advisory
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref cause) = self.cause {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for WriterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(Cause::Backend(e)) => Some(e),
            Some(Cause::Catalog(e)) => Some(e),
            Some(Cause::Statistics(e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for writer operations
pub type WriterResult<T> = Result<T, WriterError>;
