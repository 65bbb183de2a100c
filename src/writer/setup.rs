//! Outcome of administrative setup for one adapter on one index

use super::errors::WriterError;

/// Result of one administrative step.
///
/// `Failed` carries an advisory error: the optimization is missing, the
/// data path is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStep {
    /// This call performed the backend action
    Performed,
    /// Claimed earlier in this process, or already present on the backend
    AlreadyDone,
    /// Turned off by writer options
    Disabled,
    /// The adapter does not need this step
    NotApplicable,
    Failed(WriterError),
}

impl SetupStep {
    pub fn is_failed(&self) -> bool {
        matches!(self, SetupStep::Failed(_))
    }

    pub fn failure(&self) -> Option<&WriterError> {
        match self {
            SetupStep::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub row_merging: SetupStep,
    pub locality_group: SetupStep,
}

impl SetupReport {
    /// Whether any optimization could not be enabled
    pub fn is_degraded(&self) -> bool {
        self.row_merging.is_failed() || self.locality_group.is_failed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &WriterError> {
        self.row_merging
            .failure()
            .into_iter()
            .chain(self.locality_group.failure())
    }
}
