//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, `severity` second, remaining fields sorted by key
//! - Synchronous, no buffering
//! - WARN and above go to stderr

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

/// Environment variable selecting the minimum logged severity
pub const LOG_LEVEL_ENV: &str = "KVINGEST_LOG";

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues, including degraded administrative setup
    Warn = 2,
    /// Operation failures surfaced to the caller
    Error = 3,
    /// Writer state can no longer be trusted
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parse a level name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            "fatal" => Some(Severity::Fatal),
            _ => None,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sentinel meaning "not yet resolved from the environment"
const UNSET: u8 = u8::MAX;

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(UNSET);
static ENV_SEVERITY: OnceLock<Severity> = OnceLock::new();

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Override the minimum severity for the whole process
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Current minimum severity (explicit override, else `KVINGEST_LOG`, else INFO)
    pub fn min_severity() -> Severity {
        match MIN_SEVERITY.load(Ordering::Relaxed) {
            UNSET => *ENV_SEVERITY.get_or_init(|| {
                std::env::var(LOG_LEVEL_ENV)
                    .ok()
                    .and_then(|v| Severity::parse(&v))
                    .unwrap_or(Severity::Info)
            }),
            v => Severity::from_u8(v),
        }
    }

    /// Whether a record at this severity would be emitted
    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        if severity >= Severity::Warn {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::format_line(severity, event, fields);
        // One write per line; a failing sink must never fail the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(256);

        output.push_str("{\"event\":");
        push_json_string(&mut output, event);
        output.push_str(",\"severity\":\"");
        output.push_str(severity.as_str());
        output.push('"');

        let mut sorted_fields: Vec<_> = fields.iter().collect();
        sorted_fields.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted_fields {
            output.push(',');
            push_json_string(&mut output, key);
            output.push(':');
            push_json_string(&mut output, value);
        }

        output.push_str("}\n");
        output
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

fn push_json_string(output: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => output.push_str(&quoted),
        // Serializing a &str cannot fail; keep the line well-formed regardless
        Err(_) => output.push_str("\"\""),
    }
}

/// Render a log line without emitting it
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("WARN"), Some(Severity::Warn));
        assert_eq!(Severity::parse(" trace "), Some(Severity::Trace));
        assert_eq!(Severity::parse("loud"), None);
    }

    #[test]
    fn test_log_json_format() {
        let output = capture_log(Severity::Info, "STATS_FLUSH", &[("adapters", "2")]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "STATS_FLUSH");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["adapters"], "2");
    }

    #[test]
    fn test_fields_sorted_after_event_and_severity() {
        let shuffled = capture_log(
            Severity::Info,
            "WRITER_OPEN",
            &[("writer", "w1"), ("alt_index", "true"), ("index", "roads")],
        );
        let ordered = capture_log(
            Severity::Info,
            "WRITER_OPEN",
            &[("alt_index", "true"), ("index", "roads"), ("writer", "w1")],
        );
        assert_eq!(shuffled, ordered);
        assert!(shuffled.starts_with("{\"event\":\"WRITER_OPEN\",\"severity\":\"INFO\""));

        let positions: Vec<usize> = ["alt_index", "index", "writer"]
            .iter()
            .map(|key| shuffled.find(&format!("\"{}\"", key)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let output = capture_log(Severity::Warn, "ADMIN_SETUP_FAILED", &[("table", "roads\"\n\u{1}")]);
        assert_eq!(output.chars().filter(|c| *c == '\n').count(), 1);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["table"], "roads\"\n\u{1}");
    }
}
