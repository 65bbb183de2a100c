//! Index definitions
//!
//! An index is immutable identity plus a derivation from an adapter's
//! encoding of an entity to the primary-table row ids it occupies.
//!
//! # Invariants
//!
//! - Every encoding maps to at least one row id
//! - Row ids carry their adapter id and data id, recoverable via `RowId::decode`
//! - The alternate table of an index is its table name + `_ALT_INDEX`

mod errors;
mod primary;
mod row_id;

pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use primary::{PrimaryIndex, SortedKeyIndex, ALT_INDEX_TABLE_SUFFIX};
pub use row_id::RowId;
