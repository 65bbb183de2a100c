//! In-process backend
//!
//! A complete implementation of the backend facade over sorted in-memory
//! tables. Cells are checksummed on write and verified on every scan.
//! Every facade call is counted, and any call can be made to fail once or
//! permanently, which is what the write-path tests are built on.
//!
//! Locality group calls against an absent table treat it as empty: the
//! existence check reports `false` and adding a group creates the table.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::checksum::{compute_row_checksum, verify_row_checksum};
use super::errors::{BackendError, BackendResult};
use super::operations::{BackendOperations, IteratorSetting, Row, WriteHandle};
use crate::types::ByteArrayId;

/// Facade and handle calls, for counting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    TableExists,
    CreateWriteHandle,
    DeleteTable,
    LocalityGroupExists,
    AddLocalityGroup,
    AttachIterators,
    HandleWrite,
    HandleFlush,
    HandleClose,
}

impl BackendOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendOp::TableExists => "table_exists",
            BackendOp::CreateWriteHandle => "create_write_handle",
            BackendOp::DeleteTable => "delete_table",
            BackendOp::LocalityGroupExists => "locality_group_exists",
            BackendOp::AddLocalityGroup => "add_locality_group",
            BackendOp::AttachIterators => "attach_iterators",
            BackendOp::HandleWrite => "handle_write",
            BackendOp::HandleFlush => "handle_flush",
            BackendOp::HandleClose => "handle_close",
        }
    }
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Number of calls made per operation, failed calls included
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendCallCounts {
    pub table_exists: u64,
    pub create_write_handle: u64,
    pub delete_table: u64,
    pub locality_group_exists: u64,
    pub add_locality_group: u64,
    pub attach_iterators: u64,
    pub handle_write: u64,
    pub handle_flush: u64,
    pub handle_close: u64,
}

impl BackendCallCounts {
    fn slot(&mut self, op: BackendOp) -> &mut u64 {
        match op {
            BackendOp::TableExists => &mut self.table_exists,
            BackendOp::CreateWriteHandle => &mut self.create_write_handle,
            BackendOp::DeleteTable => &mut self.delete_table,
            BackendOp::LocalityGroupExists => &mut self.locality_group_exists,
            BackendOp::AddLocalityGroup => &mut self.add_locality_group,
            BackendOp::AttachIterators => &mut self.attach_iterators,
            BackendOp::HandleWrite => &mut self.handle_write,
            BackendOp::HandleFlush => &mut self.handle_flush,
            BackendOp::HandleClose => &mut self.handle_close,
        }
    }

    pub fn get(&self, op: BackendOp) -> u64 {
        match op {
            BackendOp::TableExists => self.table_exists,
            BackendOp::CreateWriteHandle => self.create_write_handle,
            BackendOp::DeleteTable => self.delete_table,
            BackendOp::LocalityGroupExists => self.locality_group_exists,
            BackendOp::AddLocalityGroup => self.add_locality_group,
            BackendOp::AttachIterators => self.attach_iterators,
            BackendOp::HandleWrite => self.handle_write,
            BackendOp::HandleFlush => self.handle_flush,
            BackendOp::HandleClose => self.handle_close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Once,
    Always,
}

type CellKey = (Vec<u8>, Vec<u8>, Vec<u8>);

#[derive(Debug, Default)]
struct MemoryTable {
    /// (key, family, qualifier) -> (value, checksum)
    cells: BTreeMap<CellKey, (Vec<u8>, u32)>,
    locality_groups: BTreeSet<Vec<u8>>,
    iterators: BTreeMap<String, IteratorSetting>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
    counts: Mutex<BackendCallCounts>,
    faults: Mutex<HashMap<BackendOp, Fault>>,
    /// Rows a handle may hold before it applies them; 0 = write-through
    buffer_limit: usize,
}

/// Counters and fault maps stay usable after a panic elsewhere
fn lock_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Count the call, then fail it if a fault is armed
    fn enter(&self, op: BackendOp) -> BackendResult<()> {
        *lock_recover(&self.counts).slot(op) += 1;

        let mut faults = lock_recover(&self.faults);
        match faults.get(&op).copied() {
            Some(Fault::Once) => {
                faults.remove(&op);
                Err(injected(op))
            }
            Some(Fault::Always) => Err(injected(op)),
            None => Ok(()),
        }
    }

    fn tables(&self) -> BackendResult<MutexGuard<'_, BTreeMap<String, MemoryTable>>> {
        self.tables
            .lock()
            .map_err(|_| BackendError::Poisoned("memory backend tables".to_string()))
    }

    fn apply(&self, table: &str, rows: &[Row]) -> BackendResult<()> {
        let mut tables = self.tables()?;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::TableNotFound(table.to_string()))?;

        for row in rows {
            let checksum = compute_row_checksum(row);
            target.cells.insert(
                (row.key.clone(), row.family.clone(), row.qualifier.clone()),
                (row.value.clone(), checksum),
            );
        }
        Ok(())
    }
}

fn injected(op: BackendOp) -> BackendError {
    BackendError::Unavailable(format!("injected fault in {}", op))
}

/// Sorted in-memory tables behind the backend facade.
///
/// Cloning shares the same tables, counters and faults.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    /// Write-through backend: rows are visible as soon as `write` returns
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles hold up to `limit` rows before applying them
    pub fn with_buffer_limit(limit: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                buffer_limit: limit,
                ..Shared::default()
            }),
        }
    }

    /// Create a table outside the counted facade
    pub fn create_table(&self, table: &str) -> BackendResult<()> {
        self.shared.tables()?.entry(table.to_string()).or_default();
        Ok(())
    }

    pub fn table_names(&self) -> BackendResult<Vec<String>> {
        Ok(self.shared.tables()?.keys().cloned().collect())
    }

    /// Fail the next call of `op`
    pub fn fail_next(&self, op: BackendOp) {
        lock_recover(&self.shared.faults).insert(op, Fault::Once);
    }

    /// Fail every call of `op` until cleared
    pub fn fail_always(&self, op: BackendOp) {
        lock_recover(&self.shared.faults).insert(op, Fault::Always);
    }

    pub fn clear_faults(&self) {
        lock_recover(&self.shared.faults).clear();
    }

    pub fn counts(&self) -> BackendCallCounts {
        lock_recover(&self.shared.counts).clone()
    }

    pub fn reset_counts(&self) {
        *lock_recover(&self.shared.counts) = BackendCallCounts::default();
    }

    /// All applied cells of a table in key order, checksum-verified
    pub fn scan(&self, table: &str) -> BackendResult<Vec<Row>> {
        let tables = self.shared.tables()?;
        let target = tables
            .get(table)
            .ok_or_else(|| BackendError::TableNotFound(table.to_string()))?;

        let mut rows = Vec::with_capacity(target.cells.len());
        for ((key, family, qualifier), (value, checksum)) in &target.cells {
            let row = Row::new(key.clone(), family.clone(), qualifier.clone(), value.clone());
            if !verify_row_checksum(&row, *checksum) {
                return Err(BackendError::Corruption {
                    table: table.to_string(),
                    row: ByteArrayId::new(key.clone()).to_string(),
                });
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Primary row ids recorded in an alternate table for one data id
    pub fn lookup_alternate(&self, table: &str, data_id: &[u8]) -> BackendResult<Vec<ByteArrayId>> {
        Ok(self
            .scan(table)?
            .into_iter()
            .filter(|row| row.key == data_id)
            .map(|row| ByteArrayId::new(row.qualifier))
            .collect())
    }

    pub fn locality_groups(&self, table: &str) -> BackendResult<Vec<Vec<u8>>> {
        let tables = self.shared.tables()?;
        let target = tables
            .get(table)
            .ok_or_else(|| BackendError::TableNotFound(table.to_string()))?;
        Ok(target.locality_groups.iter().cloned().collect())
    }

    /// Attached iterators ordered by priority
    pub fn iterators(&self, table: &str) -> BackendResult<Vec<IteratorSetting>> {
        let tables = self.shared.tables()?;
        let target = tables
            .get(table)
            .ok_or_else(|| BackendError::TableNotFound(table.to_string()))?;
        let mut settings: Vec<_> = target.iterators.values().cloned().collect();
        settings.sort_by_key(|s| s.priority);
        Ok(settings)
    }

    /// Flip one value byte of every cell under `key` without updating its
    /// checksum. Returns whether any cell was touched.
    pub fn corrupt_row(&self, table: &str, key: &[u8]) -> BackendResult<bool> {
        let mut tables = self.shared.tables()?;
        let target = tables
            .get_mut(table)
            .ok_or_else(|| BackendError::TableNotFound(table.to_string()))?;

        let mut touched = false;
        for ((cell_key, _, _), (value, _)) in target.cells.iter_mut() {
            if cell_key.as_slice() == key {
                match value.first_mut() {
                    Some(b) => *b ^= 0xff,
                    None => value.push(0xff),
                }
                touched = true;
            }
        }
        Ok(touched)
    }
}

impl BackendOperations for MemoryBackend {
    fn table_exists(&self, table: &str) -> BackendResult<bool> {
        self.shared.enter(BackendOp::TableExists)?;
        Ok(self.shared.tables()?.contains_key(table))
    }

    fn create_write_handle(
        &self,
        table: &str,
        create_if_missing: bool,
    ) -> BackendResult<Box<dyn WriteHandle>> {
        self.shared.enter(BackendOp::CreateWriteHandle)?;
        {
            let mut tables = self.shared.tables()?;
            if !tables.contains_key(table) {
                if !create_if_missing {
                    return Err(BackendError::TableNotFound(table.to_string()));
                }
                tables.insert(table.to_string(), MemoryTable::default());
            }
        }
        Ok(Box::new(MemoryWriteHandle {
            shared: Arc::clone(&self.shared),
            table: table.to_string(),
            buffer: Vec::new(),
            closed: false,
        }))
    }

    fn delete_table(&self, table: &str) -> BackendResult<()> {
        self.shared.enter(BackendOp::DeleteTable)?;
        match self.shared.tables()?.remove(table) {
            Some(_) => Ok(()),
            None => Err(BackendError::TableNotFound(table.to_string())),
        }
    }

    fn locality_group_exists(&self, table: &str, group: &[u8]) -> BackendResult<bool> {
        self.shared.enter(BackendOp::LocalityGroupExists)?;
        Ok(self
            .shared
            .tables()?
            .get(table)
            .map(|t| t.locality_groups.contains(group))
            .unwrap_or(false))
    }

    fn add_locality_group(&self, table: &str, group: &[u8]) -> BackendResult<()> {
        self.shared.enter(BackendOp::AddLocalityGroup)?;
        self.shared
            .tables()?
            .entry(table.to_string())
            .or_default()
            .locality_groups
            .insert(group.to_vec());
        Ok(())
    }

    fn attach_iterators(
        &self,
        table: &str,
        create_if_missing: bool,
        settings: &[IteratorSetting],
    ) -> BackendResult<()> {
        self.shared.enter(BackendOp::AttachIterators)?;
        let mut tables = self.shared.tables()?;
        if !tables.contains_key(table) && !create_if_missing {
            return Err(BackendError::TableNotFound(table.to_string()));
        }
        let target = tables.entry(table.to_string()).or_default();
        for setting in settings {
            target.iterators.insert(setting.name.clone(), setting.clone());
        }
        Ok(())
    }
}

/// Buffered writer for one memory table
struct MemoryWriteHandle {
    shared: Arc<Shared>,
    table: String,
    buffer: Vec<Row>,
    closed: bool,
}

impl MemoryWriteHandle {
    fn ensure_open(&self) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::HandleClosed(self.table.clone()));
        }
        Ok(())
    }

    fn drain(&mut self) -> BackendResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.shared.apply(&self.table, &self.buffer)?;
        self.buffer.clear();
        Ok(())
    }
}

impl WriteHandle for MemoryWriteHandle {
    fn write(&mut self, rows: &[Row]) -> BackendResult<()> {
        self.shared.enter(BackendOp::HandleWrite)?;
        self.ensure_open()?;
        self.buffer.extend_from_slice(rows);
        if self.buffer.len() > self.shared.buffer_limit {
            self.drain()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> BackendResult<()> {
        self.shared.enter(BackendOp::HandleFlush)?;
        self.ensure_open()?;
        self.drain()
    }

    fn close(&mut self) -> BackendResult<()> {
        self.shared.enter(BackendOp::HandleClose)?;
        if self.closed {
            return Ok(());
        }
        let result = self.drain();
        self.closed = true;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> Row {
        Row::new(key, "adapter", "field", value)
    }

    #[test]
    fn test_handle_requires_table_unless_create() {
        let backend = MemoryBackend::new();
        assert_eq!(
            backend.create_write_handle("roads", false).err(),
            Some(BackendError::TableNotFound("roads".to_string()))
        );
        assert!(backend.create_write_handle("roads", true).is_ok());
        assert!(backend.table_exists("roads").unwrap());
    }

    #[test]
    fn test_write_through_by_default() {
        let backend = MemoryBackend::new();
        let mut handle = backend.create_write_handle("roads", true).unwrap();
        handle.write(&[row("a", "1")]).unwrap();
        assert_eq!(backend.scan("roads").unwrap().len(), 1);
    }

    #[test]
    fn test_buffered_rows_visible_after_flush() {
        let backend = MemoryBackend::with_buffer_limit(10);
        let mut handle = backend.create_write_handle("roads", true).unwrap();
        handle.write(&[row("a", "1"), row("b", "2")]).unwrap();
        assert!(backend.scan("roads").unwrap().is_empty());

        handle.flush().unwrap();
        assert_eq!(backend.scan("roads").unwrap().len(), 2);
    }

    #[test]
    fn test_closed_handle_rejects_writes() {
        let backend = MemoryBackend::with_buffer_limit(10);
        let mut handle = backend.create_write_handle("roads", true).unwrap();
        handle.write(&[row("a", "1")]).unwrap();
        handle.close().unwrap();

        assert_eq!(backend.scan("roads").unwrap().len(), 1);
        assert_eq!(
            handle.write(&[row("b", "2")]),
            Err(BackendError::HandleClosed("roads".to_string()))
        );
        // Second close is a no-op
        assert!(handle.close().is_ok());
    }

    #[test]
    fn test_fail_next_fails_exactly_once() {
        let backend = MemoryBackend::new();
        backend.fail_next(BackendOp::TableExists);
        assert!(matches!(
            backend.table_exists("roads"),
            Err(BackendError::Unavailable(_))
        ));
        assert_eq!(backend.table_exists("roads"), Ok(false));
        assert_eq!(backend.counts().table_exists, 2);
    }

    #[test]
    fn test_fail_always_until_cleared() {
        let backend = MemoryBackend::new();
        backend.fail_always(BackendOp::AddLocalityGroup);
        assert!(backend.add_locality_group("roads", b"a").is_err());
        assert!(backend.add_locality_group("roads", b"a").is_err());
        backend.clear_faults();
        assert!(backend.add_locality_group("roads", b"a").is_ok());
        assert_eq!(backend.counts().get(BackendOp::AddLocalityGroup), 3);
    }

    #[test]
    fn test_locality_groups_on_absent_table() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.locality_group_exists("roads", b"a"), Ok(false));
        backend.add_locality_group("roads", b"a").unwrap();
        backend.add_locality_group("roads", b"a").unwrap();
        assert_eq!(backend.locality_groups("roads").unwrap(), vec![b"a".to_vec()]);
    }

    #[test]
    fn test_attach_iterators_replaces_by_name() {
        let backend = MemoryBackend::new();
        assert!(backend
            .attach_iterators("roads", false, &[IteratorSetting::new("m", 5, "X")])
            .is_err());

        backend
            .attach_iterators("roads", true, &[IteratorSetting::new("m", 5, "X")])
            .unwrap();
        backend
            .attach_iterators("roads", true, &[IteratorSetting::new("m", 3, "Y")])
            .unwrap();

        let iterators = backend.iterators("roads").unwrap();
        assert_eq!(iterators.len(), 1);
        assert_eq!(iterators[0].class, "Y");
    }

    #[test]
    fn test_scan_detects_corruption() {
        let backend = MemoryBackend::new();
        let mut handle = backend.create_write_handle("roads", true).unwrap();
        handle.write(&[row("a", "1")]).unwrap();

        assert!(backend.corrupt_row("roads", b"a").unwrap());
        assert!(matches!(
            backend.scan("roads"),
            Err(BackendError::Corruption { .. })
        ));
    }

    #[test]
    fn test_delete_table() {
        let backend = MemoryBackend::new();
        backend.create_table("roads").unwrap();
        backend.delete_table("roads").unwrap();
        assert!(!backend.table_exists("roads").unwrap());
        assert!(backend.delete_table("roads").is_err());
    }
}
