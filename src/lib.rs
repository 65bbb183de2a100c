//! kvingest - Multi-index, statistics-aware write path for sorted key-value stores
//!
//! Entities are encoded by data adapters, written into primary index tables
//! (and optionally data-id keyed alternate tables) through a backend facade,
//! while per-adapter statistics are accumulated and periodically persisted.

pub mod adapter;
pub mod backend;
pub mod catalog;
pub mod index;
pub mod observability;
pub mod setup_cache;
pub mod statistics;
pub mod types;
pub mod writer;

pub use types::ByteArrayId;
pub use writer::{IndexWriter, StoreServices, WriterError, WriterOptions, WriterResult};
