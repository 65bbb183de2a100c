//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Per-writer counters
//!
//! Observability is read-only: a failing log sink never fails a write.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use metrics::{MetricsSnapshot, WriterMetrics};

/// Log a lifecycle event at its default severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

/// Log a lifecycle event at an explicit severity
pub fn log_event_at(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(Event::WriterOpen, &[("index", "roads")]);
        log_event_at(Severity::Error, Event::StatsPersistFailed, &[]);
    }
}
