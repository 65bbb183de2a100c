//! Backend operations facade
//!
//! The write path only needs a handful of abstract capabilities from a
//! storage backend: table existence and deletion, locality groups,
//! server-side iterator attachment, and exclusively-owned write handles.
//!
//! `MemoryBackend` implements the whole facade in-process.

mod checksum;
mod errors;
mod memory;
mod operations;

pub use checksum::{compute_row_checksum, verify_row_checksum};
pub use errors::{BackendError, BackendResult};
pub use memory::{BackendCallCounts, BackendOp, MemoryBackend};
pub use operations::{BackendOperations, IteratorScope, IteratorSetting, Row, WriteHandle};
