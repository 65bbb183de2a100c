//! Data adapters
//!
//! An adapter owns the encoding of one entity type: its identity, its
//! fields, and the index-space keys it is inserted under.

mod encoding;
mod traits;

pub use encoding::{AdapterEncoding, EntryInfo, FieldValue};
pub use traits::{DataAdapter, IndexDependent, RowMerging};
