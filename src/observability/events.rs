//! Observable events on the write path.
//!
//! Events are explicit and typed; the logger only ever sees their string form.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Index writer constructed
    WriterOpen,
    /// Backend write handle opened (primary or alternate)
    HandleOpen,
    /// Backend write handle closed
    HandleClose,
    /// Alternate indexing downgraded for this writer
    AltIndexDisabled,
    /// Alternate table deleted because its primary table does not exist
    AltIndexStaleDeleted,
    /// Locality group created for an adapter
    LocalityGroupCreated,
    /// Row-merging iterators attached for an adapter
    MergingIteratorsAttached,
    /// Administrative setup step failed, write continues without it
    AdminSetupFailed,
    /// Accumulated statistics handed to the statistics store
    StatsFlush,
    /// Statistics store rejected an adapter's statistics
    StatsPersistFailed,
    /// Index writer closed
    WriterClose,
    /// A configuration value was ignored
    ConfigInvalid,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::WriterOpen => "WRITER_OPEN",
            Event::HandleOpen => "HANDLE_OPEN",
            Event::HandleClose => "HANDLE_CLOSE",
            Event::AltIndexDisabled => "ALT_INDEX_DISABLED",
            Event::AltIndexStaleDeleted => "ALT_INDEX_STALE_DELETED",
            Event::LocalityGroupCreated => "LOCALITY_GROUP_CREATED",
            Event::MergingIteratorsAttached => "MERGING_ITERATORS_ATTACHED",
            Event::AdminSetupFailed => "ADMIN_SETUP_FAILED",
            Event::StatsFlush => "STATS_FLUSH",
            Event::StatsPersistFailed => "STATS_PERSIST_FAILED",
            Event::WriterClose => "WRITER_CLOSE",
            Event::ConfigInvalid => "CONFIG_INVALID",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::HandleOpen | Event::HandleClose | Event::StatsFlush => Severity::Trace,
            Event::AltIndexStaleDeleted
            | Event::AdminSetupFailed
            | Event::StatsPersistFailed
            | Event::ConfigInvalid => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
