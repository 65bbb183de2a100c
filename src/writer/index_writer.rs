//! Index writer
//!
//! Writes entities into one primary index table, and optionally into its
//! alternate (data-id keyed) table, while accumulating per-adapter
//! statistics.
//!
//! # Locking
//!
//! One mutex guards the write handles and the statistics buffer. Catalog registration, handle opening, row writes and
//! statistics updates for a single entity happen under it, so concurrent
//! writes are serialized per writer. Administrative setup runs before the
//! lock is taken; it is deduplicated across writers by the shared setup
//! caches and never blocks data writes of other threads on this writer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::config::WriterOptions;
use super::errors::{WriterError, WriterResult};
use super::services::StoreServices;
use super::setup::{SetupReport, SetupStep};
use crate::adapter::{DataAdapter, EntryInfo};
use crate::backend::{BackendOperations, WriteHandle};
use crate::catalog::{AdapterRecord, IndexRecord};
use crate::index::PrimaryIndex;
use crate::observability::{log_event, log_event_at, Event, MetricsSnapshot, Severity, WriterMetrics};
use crate::setup_cache::{LOCALITY_GROUP_CACHE_ID, ROW_MERGING_CACHE_ID};
use crate::statistics::StatisticsBuffer;
use crate::types::ByteArrayId;

/// What triggered a statistics flush; only used for logging
#[derive(Debug, Clone, Copy)]
enum FlushTrigger {
    Threshold,
    Explicit,
    Close,
}

impl FlushTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Threshold => "threshold",
            FlushTrigger::Explicit => "flush",
            FlushTrigger::Close => "close",
        }
    }
}

struct WriterState {
    primary: Option<Box<dyn WriteHandle>>,
    alternate: Option<Box<dyn WriteHandle>>,
    statistics: StatisticsBuffer,
}

/// Writer bound to one primary index.
///
/// Handles are opened lazily on the first write and reused until `close`.
/// A closed writer rejects writes; `flush` and `close` stay callable.
pub struct IndexWriter {
    writer_id: Uuid,
    index: Arc<dyn PrimaryIndex>,
    services: StoreServices,
    options: WriterOptions,
    table_name: String,
    alt_table_name: String,
    use_alt_index: bool,
    skip_stats_flush: bool,
    closed: AtomicBool,
    metrics: WriterMetrics,
    state: Mutex<WriterState>,
}

impl IndexWriter {
    /// Create a writer for `index`.
    ///
    /// Never fails. When alternate indexing is requested, the alternate
    /// table is reconciled with the primary first:
    /// - primary exists, alternate missing: alternate indexing is disabled
    /// - primary missing, alternate exists: the stale alternate is deleted
    ///
    /// A backend error during reconciliation disables alternate indexing.
    pub fn new(index: Arc<dyn PrimaryIndex>, services: StoreServices, options: WriterOptions) -> Self {
        let writer_id = Uuid::new_v4();
        let table_name = index.table_name();
        let alt_table_name = index.alt_table_name();

        let use_alt_index = options.use_alt_index
            && reconcile_alt_index(
                services.backend.as_ref(),
                &writer_id,
                &table_name,
                &alt_table_name,
            );
        let skip_stats_flush = options.resolve_skip_stats_flush();

        let id = writer_id.to_string();
        let threshold = options.stats_flush_threshold.to_string();
        log_event(
            Event::WriterOpen,
            &[
                ("alt_index", bool_str(use_alt_index)),
                ("flush_threshold", threshold.as_str()),
                ("index", table_name.as_str()),
                ("skip_stats_flush", bool_str(skip_stats_flush)),
                ("statistics", bool_str(options.persist_statistics)),
                ("writer", id.as_str()),
            ],
        );

        let statistics = StatisticsBuffer::new(options.stats_flush_threshold, skip_stats_flush);
        Self {
            writer_id,
            index,
            services,
            options,
            table_name,
            alt_table_name,
            use_alt_index,
            skip_stats_flush,
            closed: AtomicBool::new(false),
            metrics: WriterMetrics::new(),
            state: Mutex::new(WriterState {
                primary: None,
                alternate: None,
                statistics,
            }),
        }
    }

    pub fn writer_id(&self) -> Uuid {
        self.writer_id
    }

    pub fn index(&self) -> &Arc<dyn PrimaryIndex> {
        &self.index
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn alt_table_name(&self) -> &str {
        &self.alt_table_name
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Whether alternate rows are written; may be false even when requested
    pub fn alt_index_enabled(&self) -> bool {
        self.use_alt_index
    }

    pub fn skip_stats_flush(&self) -> bool {
        self.skip_stats_flush
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Adapter id -> entries accumulated but not yet persisted
    pub fn pending_statistics(&self) -> WriterResult<BTreeMap<ByteArrayId, u64>> {
        Ok(self.lock_state()?.statistics.pending())
    }

    /// Write one entity and return the primary row ids it was stored under.
    ///
    /// Index-dependent adapters first expand the entity into index-specific
    /// derivatives; each derivative is written in turn and the row ids are
    /// concatenated. The first failing derivative fails the call, earlier
    /// derivatives stay written.
    pub fn write<T: 'static>(&self, adapter: &dyn DataAdapter<T>, entry: &T) -> WriterResult<Vec<ByteArrayId>> {
        match adapter.index_dependent() {
            Some(dependent) => {
                let mut row_ids = Vec::new();
                for derived in dependent.convert_to_index(self.index.as_ref(), entry) {
                    row_ids.extend(self.write_entity(adapter, &derived)?);
                }
                Ok(row_ids)
            }
            None => self.write_entity(adapter, entry),
        }
    }

    fn write_entity<T: 'static>(&self, adapter: &dyn DataAdapter<T>, entry: &T) -> WriterResult<Vec<ByteArrayId>> {
        if self.is_closed() {
            return Err(WriterError::writer_closed(&self.table_name));
        }

        // Advisory: failures are logged and reported, the write proceeds.
        self.setup_adapter(adapter);

        let mut state = self.lock_state()?;
        if self.is_closed() {
            return Err(WriterError::writer_closed(&self.table_name));
        }

        let adapter_id = adapter.adapter_id();
        if self.options.persist_statistics {
            state
                .statistics
                .ensure_compatible::<T>(adapter_id)
                .map_err(WriterError::statistics_failed)?;
        }

        self.services
            .catalog
            .store_adapter(&AdapterRecord::from_adapter(adapter))
            .map_err(WriterError::catalog_failed)?;
        self.services
            .catalog
            .store_index(&IndexRecord::from_index(self.index.as_ref()))
            .map_err(WriterError::catalog_failed)?;

        self.ensure_open(&mut state)?;

        let encoding = adapter.encode(self.index.as_ref(), entry);
        let row_ids = self.index.row_ids(adapter_id, &encoding);
        let info = EntryInfo::new(adapter_id.clone(), row_ids, encoding);

        let rows = info.primary_rows();
        let primary = state
            .primary
            .as_mut()
            .ok_or_else(|| WriterError::writer_closed(&self.table_name))?;
        primary
            .write(&rows)
            .map_err(|e| WriterError::write_failed(&self.table_name, e))?;
        self.metrics.add_rows(rows.len() as u64);

        if self.use_alt_index {
            let alt_rows = info.alternate_rows();
            let alternate = state
                .alternate
                .as_mut()
                .ok_or_else(|| WriterError::writer_closed(&self.alt_table_name))?;
            alternate
                .write(&alt_rows)
                .map_err(|e| WriterError::write_failed(&self.alt_table_name, e))?;
            self.metrics.add_alt_rows(alt_rows.len() as u64);
        }
        self.metrics.increment_entries();

        if self.options.persist_statistics {
            let flush_due = state
                .statistics
                .record(adapter, self.index.as_ref(), &info, entry)
                .map_err(WriterError::statistics_failed)?;
            if flush_due {
                // Rows are written; rejected statistics were logged and
                // stay buffered for the next flush.
                let _ = self.flush_statistics(&mut state, FlushTrigger::Threshold);
            }
        }

        Ok(info.row_ids)
    }

    /// Run the administrative steps `adapter` needs on this index.
    ///
    /// Each step is claimed in its shared setup cache before it is
    /// attempted, so across all writers sharing the caches it runs at most
    /// once per adapter and index, even when the attempt fails.
    pub fn setup_adapter<T: 'static>(&self, adapter: &dyn DataAdapter<T>) -> SetupReport {
        let adapter_id = adapter.adapter_id();

        let row_merging = match adapter.row_merging() {
            None => SetupStep::NotApplicable,
            Some(merging) => {
                let claimed = self
                    .services
                    .setup_caches
                    .cache(ROW_MERGING_CACHE_ID)
                    .add_if_absent(adapter_id, &self.table_name);
                if !claimed {
                    SetupStep::AlreadyDone
                } else {
                    let iterators = merging.merging_iterators();
                    match self.services.backend.attach_iterators(
                        &self.table_name,
                        self.options.create_table,
                        &iterators,
                    ) {
                        Ok(()) => {
                            let count = iterators.len().to_string();
                            log_event(
                                Event::MergingIteratorsAttached,
                                &[
                                    ("adapter", adapter_id.to_string().as_str()),
                                    ("index", self.table_name.as_str()),
                                    ("iterators", count.as_str()),
                                ],
                            );
                            self.metrics.increment_setup_actions();
                            SetupStep::Performed
                        }
                        Err(e) => self.setup_failed("attach_iterators", adapter_id, e),
                    }
                }
            }
        };

        let locality_group = if !self.options.use_locality_groups {
            SetupStep::Disabled
        } else if !self
            .services
            .setup_caches
            .cache(LOCALITY_GROUP_CACHE_ID)
            .add_if_absent(adapter_id, &self.table_name)
        {
            SetupStep::AlreadyDone
        } else {
            self.ensure_locality_group(adapter_id)
        };

        SetupReport {
            row_merging,
            locality_group,
        }
    }

    fn ensure_locality_group(&self, adapter_id: &ByteArrayId) -> SetupStep {
        let backend = self.services.backend.as_ref();
        match backend.locality_group_exists(&self.table_name, adapter_id.as_bytes()) {
            Ok(true) => SetupStep::AlreadyDone,
            Ok(false) => match backend.add_locality_group(&self.table_name, adapter_id.as_bytes()) {
                Ok(()) => {
                    log_event(
                        Event::LocalityGroupCreated,
                        &[
                            ("adapter", adapter_id.to_string().as_str()),
                            ("index", self.table_name.as_str()),
                        ],
                    );
                    self.metrics.increment_setup_actions();
                    SetupStep::Performed
                }
                Err(e) => self.setup_failed("add_locality_group", adapter_id, e),
            },
            Err(e) => self.setup_failed("locality_group_exists", adapter_id, e),
        }
    }

    fn setup_failed(&self, step: &str, adapter_id: &ByteArrayId, source: crate::backend::BackendError) -> SetupStep {
        let err = WriterError::setup_failed(step, adapter_id, source);
        log_event(
            Event::AdminSetupFailed,
            &[
                ("adapter", adapter_id.to_string().as_str()),
                ("error", err.to_string().as_str()),
                ("index", self.table_name.as_str()),
                ("step", step),
            ],
        );
        self.metrics.increment_setup_failures();
        SetupStep::Failed(err)
    }

    /// Flush buffered rows on both handles, then persist all accumulated
    /// statistics. Every part is attempted; the first error is returned.
    pub fn flush(&self) -> WriterResult<()> {
        let mut state = self.lock_state()?;
        let mut first_err = None;

        if let Some(handle) = state.primary.as_mut() {
            if let Err(e) = handle.flush() {
                first_err.get_or_insert(WriterError::flush_failed(&self.table_name, e));
            }
        }
        if let Some(handle) = state.alternate.as_mut() {
            if let Err(e) = handle.flush() {
                first_err.get_or_insert(WriterError::flush_failed(&self.alt_table_name, e));
            }
        }
        if let Err(e) = self.flush_statistics(&mut state, FlushTrigger::Explicit) {
            first_err.get_or_insert(e);
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Close both handles and persist all accumulated statistics.
    ///
    /// Idempotent: a second call finds nothing open and nothing pending.
    /// Handles are released even when closing them fails.
    pub fn close(&self) -> WriterResult<()> {
        let mut state = self.lock_state()?;
        let first_close = !self.closed.swap(true, Ordering::AcqRel);
        let mut first_err = None;

        if let Some(mut handle) = state.primary.take() {
            match handle.close() {
                Ok(()) => log_handle(Event::HandleClose, &self.writer_id, &self.table_name),
                Err(e) => {
                    first_err.get_or_insert(WriterError::close_failed(&self.table_name, e));
                }
            }
        }
        if let Some(mut handle) = state.alternate.take() {
            match handle.close() {
                Ok(()) => log_handle(Event::HandleClose, &self.writer_id, &self.alt_table_name),
                Err(e) => {
                    first_err.get_or_insert(WriterError::close_failed(&self.alt_table_name, e));
                }
            }
        }
        if let Err(e) = self.flush_statistics(&mut state, FlushTrigger::Close) {
            first_err.get_or_insert(e);
        }

        if first_close {
            let id = self.writer_id.to_string();
            let metrics = self.metrics.snapshot().to_json();
            log_event(
                Event::WriterClose,
                &[
                    ("clean", bool_str(first_err.is_none())),
                    ("index", self.table_name.as_str()),
                    ("metrics", metrics.as_str()),
                    ("writer", id.as_str()),
                ],
            );
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn lock_state(&self) -> WriterResult<MutexGuard<'_, WriterState>> {
        self.state
            .lock()
            .map_err(|_| WriterError::lock_poisoned(&self.table_name))
    }

    fn ensure_open(&self, state: &mut WriterState) -> WriterResult<()> {
        if state.primary.is_none() {
            state.primary = Some(self.open_handle(&self.table_name)?);
        }
        if self.use_alt_index && state.alternate.is_none() {
            state.alternate = Some(self.open_handle(&self.alt_table_name)?);
        }
        Ok(())
    }

    fn open_handle(&self, table: &str) -> WriterResult<Box<dyn WriteHandle>> {
        let handle = self
            .services
            .backend
            .create_write_handle(table, self.options.create_table)
            .map_err(|e| WriterError::handle_open_failed(table, e))?;
        self.metrics.increment_handles_opened();
        log_handle(Event::HandleOpen, &self.writer_id, table);
        Ok(handle)
    }

    fn flush_statistics(&self, state: &mut WriterState, trigger: FlushTrigger) -> WriterResult<()> {
        if !self.options.persist_statistics || state.statistics.is_empty() {
            return Ok(());
        }

        let report = state.statistics.flush_all(self.services.statistics.as_ref());
        self.metrics.increment_stats_flushes();

        let persisted = report.persisted.len().to_string();
        let failed = report.failed.len().to_string();
        log_event(
            Event::StatsFlush,
            &[
                ("failed", failed.as_str()),
                ("index", self.table_name.as_str()),
                ("persisted", persisted.as_str()),
                ("trigger", trigger.as_str()),
            ],
        );
        for (adapter_id, err) in &report.failed {
            log_event(
                Event::StatsPersistFailed,
                &[
                    ("adapter", adapter_id.to_string().as_str()),
                    ("error", err.to_string().as_str()),
                    ("index", self.table_name.as_str()),
                ],
            );
        }

        report
            .into_result()
            .map(|_| ())
            .map_err(WriterError::statistics_failed)
    }
}

/// Returns whether alternate indexing stays enabled
fn reconcile_alt_index(
    backend: &dyn BackendOperations,
    writer_id: &Uuid,
    table_name: &str,
    alt_table_name: &str,
) -> bool {
    let id = writer_id.to_string();
    let disable = |severity: Severity, reason: &str| {
        log_event_at(
            severity,
            Event::AltIndexDisabled,
            &[
                ("alt_table", alt_table_name),
                ("index", table_name),
                ("reason", reason),
                ("writer", id.as_str()),
            ],
        );
        false
    };

    let primary_exists = match backend.table_exists(table_name) {
        Ok(exists) => exists,
        Err(e) => return disable(Severity::Warn, e.to_string().as_str()),
    };
    let alt_exists = match backend.table_exists(alt_table_name) {
        Ok(exists) => exists,
        Err(e) => return disable(Severity::Warn, e.to_string().as_str()),
    };

    match (primary_exists, alt_exists) {
        // Data written without the alternate table would be missing from it.
        (true, false) => disable(Severity::Info, "primary table exists without alternate table"),
        (false, true) => {
            match backend.delete_table(alt_table_name) {
                Ok(()) => log_event(
                    Event::AltIndexStaleDeleted,
                    &[("alt_table", alt_table_name), ("index", table_name), ("writer", id.as_str())],
                ),
                Err(e) => log_event(
                    Event::AdminSetupFailed,
                    &[
                        ("error", e.to_string().as_str()),
                        ("index", alt_table_name),
                        ("step", "delete_table"),
                    ],
                ),
            }
            true
        }
        _ => true,
    }
}

fn log_handle(event: Event, writer_id: &Uuid, table: &str) {
    let id = writer_id.to_string();
    log_event(event, &[("table", table), ("writer", id.as_str())]);
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterEncoding;
    use crate::backend::{BackendOp, MemoryBackend};
    use crate::catalog::MemoryCatalog;
    use crate::index::SortedKeyIndex;
    use crate::setup_cache::SetupCacheRegistry;
    use crate::statistics::MemoryStatisticsStore;

    struct Words(ByteArrayId);

    impl DataAdapter<String> for Words {
        fn adapter_id(&self) -> &ByteArrayId {
            &self.0
        }

        fn encode(&self, _index: &dyn PrimaryIndex, entry: &String) -> AdapterEncoding {
            AdapterEncoding::new(ByteArrayId::from_str(entry))
                .with_insertion_keys(vec![entry.as_bytes().to_vec()])
                .with_field("text", entry.as_bytes())
        }
    }

    fn services(backend: &MemoryBackend) -> StoreServices {
        StoreServices::new(
            Arc::new(backend.clone()),
            Arc::new(MemoryCatalog::new()),
            Arc::new(MemoryStatisticsStore::new()),
            Arc::new(SetupCacheRegistry::new()),
        )
    }

    fn writer(backend: &MemoryBackend, options: WriterOptions) -> IndexWriter {
        IndexWriter::new(
            Arc::new(SortedKeyIndex::new("words_idx")),
            services(backend),
            options.with_skip_stats_flush(false),
        )
    }

    #[test]
    fn test_handles_open_lazily_once() {
        let backend = MemoryBackend::new();
        let writer = writer(&backend, WriterOptions::default());
        assert_eq!(backend.counts().get(BackendOp::CreateWriteHandle), 0);

        let adapter = Words(ByteArrayId::from_str("words"));
        writer.write(&adapter, &"alpha".to_string()).unwrap();
        writer.write(&adapter, &"beta".to_string()).unwrap();

        assert_eq!(backend.counts().get(BackendOp::CreateWriteHandle), 1);
        assert_eq!(writer.metrics().handles_opened, 1);
        assert_eq!(writer.metrics().entries_written, 2);
    }

    #[test]
    fn test_write_returns_row_ids() {
        let backend = MemoryBackend::new();
        let writer = writer(&backend, WriterOptions::default());
        let adapter = Words(ByteArrayId::from_str("words"));

        let ids = writer.write(&adapter, &"alpha".to_string()).unwrap();
        assert_eq!(ids.len(), 1);
        writer.close().unwrap();

        let rows = backend.scan("words_idx").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, ids[0].as_bytes());
    }

    #[test]
    fn test_write_after_close_rejected() {
        let backend = MemoryBackend::new();
        let writer = writer(&backend, WriterOptions::default());
        let adapter = Words(ByteArrayId::from_str("words"));

        writer.close().unwrap();
        let err = writer.write(&adapter, &"late".to_string()).unwrap_err();
        assert_eq!(err.code(), crate::writer::WriterErrorCode::KviWriterClosed);
        assert_eq!(backend.counts().get(BackendOp::CreateWriteHandle), 0);
    }

    #[test]
    fn test_locality_groups_disabled() {
        let backend = MemoryBackend::new();
        let writer = writer(&backend, WriterOptions::default().with_locality_groups(false));
        let adapter = Words(ByteArrayId::from_str("words"));

        let report = writer.setup_adapter(&adapter);
        assert_eq!(report.locality_group, SetupStep::Disabled);
        assert_eq!(report.row_merging, SetupStep::NotApplicable);
        assert_eq!(backend.counts().get(BackendOp::LocalityGroupExists), 0);
    }

    #[test]
    fn test_statistics_disabled_accumulates_nothing() {
        let backend = MemoryBackend::new();
        let writer = writer(&backend, WriterOptions::default().with_statistics(false));
        let adapter = Words(ByteArrayId::from_str("words"));

        writer.write(&adapter, &"alpha".to_string()).unwrap();
        assert!(writer.pending_statistics().unwrap().is_empty());
        writer.close().unwrap();
        assert_eq!(writer.metrics().stats_flushes, 0);
    }
}
