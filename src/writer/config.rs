//! Index writer configuration

use serde::{Deserialize, Serialize};

use crate::observability::{log_event, Event};
use crate::statistics::DEFAULT_FLUSH_THRESHOLD;

/// Environment variable disabling the statistics flush threshold.
///
/// `true` (any case) defers statistics persistence to explicit
/// `flush`/`close`, for bulk loads that should pay the cost once.
pub const SKIP_STATS_FLUSH_ENV: &str = "KVINGEST_SKIP_STATS_FLUSH";

/// Options for one index writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterOptions {
    /// Create the primary/alternate tables on first use (default: true)
    #[serde(default = "default_true")]
    pub create_table: bool,

    /// Maintain the data-id keyed alternate table (default: false)
    #[serde(default)]
    pub use_alt_index: bool,

    /// Accumulate and persist per-adapter statistics (default: true)
    #[serde(default = "default_true")]
    pub persist_statistics: bool,

    /// One locality group per adapter on the primary table (default: true)
    #[serde(default = "default_true")]
    pub use_locality_groups: bool,

    /// Entries recorded between automatic statistics flushes (default: 16384)
    #[serde(default = "default_flush_threshold")]
    pub stats_flush_threshold: usize,

    /// Overrides `KVINGEST_SKIP_STATS_FLUSH` when set
    #[serde(default)]
    pub skip_stats_flush: Option<bool>,
}

fn default_true() -> bool {
    true
}

fn default_flush_threshold() -> usize {
    DEFAULT_FLUSH_THRESHOLD
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            create_table: true,
            use_alt_index: false,
            persist_statistics: true,
            use_locality_groups: true,
            stats_flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            skip_stats_flush: None,
        }
    }
}

impl WriterOptions {
    pub fn with_create_table(mut self, enabled: bool) -> Self {
        self.create_table = enabled;
        self
    }

    pub fn with_alt_index(mut self, enabled: bool) -> Self {
        self.use_alt_index = enabled;
        self
    }

    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.persist_statistics = enabled;
        self
    }

    pub fn with_locality_groups(mut self, enabled: bool) -> Self {
        self.use_locality_groups = enabled;
        self
    }

    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.stats_flush_threshold = threshold;
        self
    }

    pub fn with_skip_stats_flush(mut self, skip: bool) -> Self {
        self.skip_stats_flush = Some(skip);
        self
    }

    /// Explicit option first, then the environment, else false
    pub fn resolve_skip_stats_flush(&self) -> bool {
        match self.skip_stats_flush {
            Some(skip) => skip,
            None => skip_stats_flush_from_env(),
        }
    }
}

/// Interpret a raw toggle value. Unset, empty and `false` are off;
/// anything other than `true` is rejected and handed back.
pub fn parse_skip_stats_flush(value: Option<&str>) -> Result<bool, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(v.to_string()),
    }
}

fn skip_stats_flush_from_env() -> bool {
    let raw = std::env::var(SKIP_STATS_FLUSH_ENV).ok();
    match parse_skip_stats_flush(raw.as_deref()) {
        Ok(skip) => skip,
        Err(value) => {
            log_event(
                Event::ConfigInvalid,
                &[("value", value.as_str()), ("variable", SKIP_STATS_FLUSH_ENV)],
            );
            false
        }
    }
}
