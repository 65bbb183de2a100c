//! Abstract operations the write path needs from a storage backend.
//!
//! No wire protocol is implied. Every call may block on I/O and none is
//! cancellable mid-call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::BackendResult;

/// One backend cell
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Row {
    pub key: Vec<u8>,
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub value: Vec<u8>,
}

impl Row {
    pub fn new(
        key: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            key: key.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }
}

/// Phases in which a server-side iterator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IteratorScope {
    /// Applied to scans
    Scan,
    /// Applied to minor compactions (memory to disk)
    MinorCompaction,
    /// Applied to major compactions (file merges)
    MajorCompaction,
}

impl IteratorScope {
    pub const ALL: [IteratorScope; 3] = [
        IteratorScope::Scan,
        IteratorScope::MinorCompaction,
        IteratorScope::MajorCompaction,
    ];
}

/// A server-side iterator to attach to a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorSetting {
    /// Unique name on the table; attaching the same name again replaces it
    pub name: String,
    /// Lower runs first
    pub priority: u32,
    /// Backend-side implementation identifier
    pub class: String,
    pub scopes: Vec<IteratorScope>,
    pub options: BTreeMap<String, String>,
}

impl IteratorSetting {
    /// Setting active in every scope with no options
    pub fn new(name: impl Into<String>, priority: u32, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority,
            class: class.into(),
            scopes: IteratorScope::ALL.to_vec(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_scopes(mut self, scopes: &[IteratorScope]) -> Self {
        self.scopes = scopes.to_vec();
        self
    }
}

/// An open, exclusively-owned writer for one table
pub trait WriteHandle: Send {
    /// Submit rows; they may be buffered until `flush`
    fn write(&mut self, rows: &[Row]) -> BackendResult<()>;

    /// Make all submitted rows durable
    fn flush(&mut self) -> BackendResult<()>;

    /// Flush and release the handle; further calls fail
    fn close(&mut self) -> BackendResult<()>;
}

/// Administrative and handle-creation operations of a backend
pub trait BackendOperations: Send + Sync {
    fn table_exists(&self, table: &str) -> BackendResult<bool>;

    /// Open a write handle, creating the table first when `create_if_missing`
    fn create_write_handle(
        &self,
        table: &str,
        create_if_missing: bool,
    ) -> BackendResult<Box<dyn WriteHandle>>;

    fn delete_table(&self, table: &str) -> BackendResult<()>;

    fn locality_group_exists(&self, table: &str, group: &[u8]) -> BackendResult<bool>;

    /// Adding a group that already exists is a no-op
    fn add_locality_group(&self, table: &str, group: &[u8]) -> BackendResult<()>;

    /// Attach server-side iterators, creating the table first when `create_if_missing`
    fn attach_iterators(
        &self,
        table: &str,
        create_if_missing: bool,
        settings: &[IteratorSetting],
    ) -> BackendResult<()>;
}
