//! In-process wide-column store
//!
//! Implements `WideColumnStore` over a BTreeMap so the durable backend can be
//! driven without a cluster. Counts batch calls and page requests, and can be
//! told to fail, which is what the backend's error paths are tested against.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, StoreError};

use super::store::{MutationBatch, WideColumnStore};

type Columns = BTreeMap<Bytes, Bytes>;

/// BTreeMap-backed `WideColumnStore`
///
/// ## Concurrency:
/// - `rows`: RwLock, one exclusive section per write or batch
/// - Counters are atomics; failure switches are checked on every call
#[derive(Default)]
pub struct MemoryWideColumnStore {
    /// Row key → (column key → value)
    rows: RwLock<BTreeMap<Vec<u8>, Columns>>,

    /// When set, every call fails as if the cluster were unreachable
    unavailable: AtomicBool,

    /// 1-based index of the batch call that should fail
    fail_batch: Mutex<Option<usize>>,

    /// Number of `execute_batch` calls, failed ones included
    batch_calls: AtomicUsize,

    /// Size of every batch received, in call order
    batch_sizes: Mutex<Vec<usize>>,

    /// Number of `column_slice` calls
    page_requests: AtomicUsize,
}

impl MemoryWideColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Failure Injection
    // =========================================================================

    /// Make every subsequent call fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the `n`-th batch call (1-based, counted from store creation)
    pub fn fail_batch(&self, n: usize) {
        *self.fail_batch.lock() = Some(n);
    }

    /// Write raw bytes, bypassing any encoding (e.g. to plant a corrupt value)
    pub fn insert_raw(&self, row: &[u8], column: &[u8], value: &[u8]) {
        self.rows
            .write()
            .entry(row.to_vec())
            .or_default()
            .insert(Bytes::copy_from_slice(column), Bytes::copy_from_slice(value));
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Number of columns stored under `row`
    pub fn column_count(&self, row: &[u8]) -> usize {
        self.rows.read().get(row).map_or(0, |columns| columns.len())
    }

    /// Total number of stored columns across all rows
    pub fn total_columns(&self) -> usize {
        self.rows.read().values().map(|columns| columns.len()).sum()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store unavailable".to_string()));
        }
        Ok(())
    }
}

impl WideColumnStore for MemoryWideColumnStore {
    fn put_column(&self, row: &[u8], column: &[u8], value: Bytes) -> Result<()> {
        self.check_available()?;
        self.rows
            .write()
            .entry(row.to_vec())
            .or_default()
            .insert(Bytes::copy_from_slice(column), value);
        Ok(())
    }

    fn get_column(&self, row: &[u8], column: &[u8]) -> Result<Option<Bytes>> {
        self.check_available()?;
        let rows = self.rows.read();
        Ok(rows.get(row).and_then(|columns| columns.get(column).cloned()))
    }

    fn delete_column(&self, row: &[u8], column: &[u8]) -> Result<()> {
        self.check_available()?;
        let mut rows = self.rows.write();
        if let Some(columns) = rows.get_mut(row) {
            columns.remove(column);
            if columns.is_empty() {
                rows.remove(row);
            }
        }
        Ok(())
    }

    fn column_slice(
        &self,
        row: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<(Bytes, Bytes)>> {
        self.check_available()?;
        self.page_requests.fetch_add(1, Ordering::SeqCst);

        let rows = self.rows.read();
        let Some(columns) = rows.get(row) else {
            return Ok(Vec::new());
        };

        let lower = match after {
            Some(column) => Bound::Excluded(column),
            None => Bound::Unbounded,
        };
        let page = columns
            .range::<[u8], _>((lower, Bound::Unbounded))
            .take(limit)
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        Ok(page)
    }

    fn execute_batch(&self, batch: MutationBatch) -> Result<()> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.batch_sizes.lock().push(batch.len());

        self.check_available()?;
        if *self.fail_batch.lock() == Some(call) {
            return Err(StoreError::Backend(format!(
                "batch {} rejected by coordinator",
                call
            )));
        }

        // Whole batch applies under one write lock
        let mut rows = self.rows.write();
        for mutation in batch.into_mutations() {
            rows.entry(mutation.row)
                .or_default()
                .insert(mutation.column, mutation.value);
        }
        Ok(())
    }
}
