//! Buffer backend implementation
//!
//! BTreeMap of per-row mutexes behind a table-level RwLock.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bitmap::{Bitmap, BitmapFactory};
use crate::error::{Result, StoreError};
use crate::io::{check_page_size, ColumnIo, ColumnObserver, Row, Table};
use crate::merge::{self, MergeStats};

type SharedRow<B> = Arc<Mutex<Row<B>>>;

/// In-memory `ColumnIo` backend
///
/// ## Miss Policy
/// Without a factory, `get` on an absent cell is `StoreError::NotFound`.
/// With a factory (attached once through `with_bitmap_factory`), `get`
/// materializes an empty bitmap, stores it, and returns it; later reads see
/// the same value.
pub struct BufferIo<B: Bitmap> {
    /// Row key → row, ordered by unsigned byte comparison
    table: RwLock<BTreeMap<Vec<u8>, SharedRow<B>>>,

    /// Builds defaults for cells read before they were written
    factory: Option<Arc<dyn BitmapFactory<B>>>,
}

impl<B: Bitmap> BufferIo<B> {
    /// Create an empty buffer that reports misses as `NotFound`
    pub fn new() -> Self {
        Self {
            table: RwLock::new(BTreeMap::new()),
            factory: None,
        }
    }

    /// Attach a factory so that misses materialize an empty bitmap
    pub fn with_bitmap_factory<F>(mut self, factory: F) -> Self
    where
        F: BitmapFactory<B> + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Whether misses are materialized
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    // =========================================================================
    // Row Access
    // =========================================================================

    /// Look up a row without creating it (shared lock only)
    fn existing_row(&self, key: &[u8]) -> Option<SharedRow<B>> {
        self.table.read().get(key).cloned()
    }

    /// Look up a row, inserting an empty one if absent
    ///
    /// The exclusive lock covers only the insert-if-absent step.
    fn row(&self, key: &[u8]) -> SharedRow<B> {
        if let Some(row) = self.existing_row(key) {
            return row;
        }

        let mut table = self.table.write();
        let row = table
            .entry(key.to_vec())
            .or_insert_with(|| Arc::new(Mutex::new(BTreeMap::new())));
        Arc::clone(row)
    }

    fn lookup(&self, key: &[u8], col: u64) -> Result<B> {
        let row = self.existing_row(key).ok_or(StoreError::NotFound { col })?;
        let bitmap = row.lock().get(&col).cloned();
        bitmap.ok_or(StoreError::NotFound { col })
    }

    // =========================================================================
    // Flush Support
    // =========================================================================

    /// Number of rows, including rows whose cells were all deleted
    ///
    /// Approximate under concurrent mutation: rows may be inserted or the
    /// table cleared between this call and any use of the result.
    pub fn approximate_row_count(&self) -> usize {
        self.table.read().len()
    }

    /// Number of cells across all rows (approximate, like the row count)
    pub fn cell_count(&self) -> usize {
        self.table.read().values().map(|row| row.lock().len()).sum()
    }

    /// True if no row holds a cell
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Copy of the whole table
    ///
    /// Each row is copied under its own lock; the snapshot is consistent per
    /// row, not across rows.
    pub fn snapshot(&self) -> Table<B> {
        self.table
            .read()
            .iter()
            .map(|(key, row)| (key.clone(), row.lock().clone()))
            .collect()
    }

    /// Drop every row
    ///
    /// A writer still holding a row obtained before the clear writes into a
    /// detached row and its update is lost.
    pub fn clear(&self) {
        self.table.write().clear();
    }

    /// Merge this buffer into `target` and clear it (see `merge::flush_to`)
    pub fn flush_to(&self, target: &dyn ColumnIo<B>) -> Result<MergeStats> {
        merge::flush_to(self, target)
    }
}

impl<B: Bitmap> Default for BufferIo<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Bitmap> ColumnIo<B> for BufferIo<B> {
    fn put(&self, key: &[u8], col: u64, bitmap: B) -> Result<()> {
        self.row(key).lock().insert(col, bitmap);
        Ok(())
    }

    fn get(&self, key: &[u8], col: u64) -> Result<B> {
        if self.factory.is_some() {
            return self.get_or_insert_default(key, col);
        }
        self.lookup(key, col)
    }

    fn get_or_insert_default(&self, key: &[u8], col: u64) -> Result<B> {
        let Some(factory) = &self.factory else {
            return self.lookup(key, col);
        };

        // Fast path: cell exists, no row creation
        if let Ok(bitmap) = self.lookup(key, col) {
            return Ok(bitmap);
        }

        let row = self.row(key);
        let mut cells = row.lock();
        let bitmap = cells
            .entry(col)
            .or_insert_with(|| factory.new_bitmap())
            .clone();
        Ok(bitmap)
    }

    fn del(&self, key: &[u8], col: u64) -> Result<()> {
        if let Some(row) = self.existing_row(key) {
            row.lock().remove(&col);
        }
        Ok(())
    }

    fn visit_all_columns(
        &self,
        key: &[u8],
        page_size: u32,
        observer: &mut dyn ColumnObserver<B>,
    ) -> Result<()> {
        check_page_size(page_size)?;

        let Some(row) = self.existing_row(key) else {
            return Ok(());
        };

        let mut after: Option<u64> = None;
        loop {
            // Copy one page out, then release the row before calling back
            let page: Vec<(u64, B)> = {
                let cells = row.lock();
                let lower = match after {
                    Some(col) => Bound::Excluded(col),
                    None => Bound::Unbounded,
                };
                cells
                    .range((lower, Bound::Unbounded))
                    .take(page_size as usize)
                    .map(|(col, bitmap)| (*col, bitmap.clone()))
                    .collect()
            };

            if page.is_empty() {
                return Ok(());
            }

            for (col, bitmap) in page {
                after = Some(col);
                observer.observe(key, col, bitmap);
            }
        }
    }
}
