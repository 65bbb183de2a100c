//! Index writer subsystem
//!
//! An `IndexWriter` is bound to one primary index and writes entities of
//! any number of adapters into it. Per entity it:
//!
//! 1. performs administrative setup once per adapter and index
//!    (row-merging iterators, locality group), best effort
//! 2. registers adapter and index with the catalog
//! 3. writes primary rows, and alternate rows when enabled
//! 4. feeds the adapter's statistics accumulators
//!
//! Statistics reach the statistics store on threshold, `flush` and `close`.

mod config;
mod errors;
mod index_writer;
mod services;
mod setup;

pub use config::{parse_skip_stats_flush, WriterOptions, SKIP_STATS_FLUSH_ENV};
pub use errors::{Severity, WriterError, WriterErrorCode, WriterResult};
pub use index_writer::IndexWriter;
pub use services::StoreServices;
pub use setup::{SetupReport, SetupStep};
