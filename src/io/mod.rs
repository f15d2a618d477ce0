//! IO Module
//!
//! The storage contract every backend satisfies.
//!
//! ## Responsibilities
//! - Point put/get/delete of a cell addressed by (row key, column id)
//! - Paged, ascending scans over all columns of one row
//! - Optional "get or insert default" for backends that materialize misses
//!
//! ## Data Model
//! ```text
//! Table:  row key (bytes, lexicographic)  →  Row
//! Row:    column id (u64, numeric)         →  Bitmap
//! ```
//!
//! Consumers hold `&dyn ColumnIo<B>` and never name a concrete backend.

mod codec;

use std::collections::BTreeMap;

pub use codec::{decode_column, encode_column, COLUMN_KEY_SIZE};

use crate::bitmap::Bitmap;
use crate::error::Result;

/// One row: column id → bitmap, ordered by column id
pub type Row<B> = BTreeMap<u64, B>;

/// Row key → row, ordered by unsigned byte comparison of the key
pub type Table<B> = BTreeMap<Vec<u8>, Row<B>>;

/// Receives cells produced by `visit_all_columns`
pub trait ColumnObserver<B> {
    fn observe(&mut self, key: &[u8], col: u64, bitmap: B);
}

impl<B, F> ColumnObserver<B> for F
where
    F: FnMut(&[u8], u64, B),
{
    fn observe(&mut self, key: &[u8], col: u64, bitmap: B) {
        self(key, col, bitmap)
    }
}

/// Storage contract shared by the buffer and durable backends
///
/// Every call commits synchronously before returning, so operations on the
/// same cell are linearizable. No ordering is promised across distinct cells.
pub trait ColumnIo<B: Bitmap>: Send + Sync {
    /// Upsert a cell; the last writer wins
    fn put(&self, key: &[u8], col: u64, bitmap: B) -> Result<()>;

    /// Read a cell
    ///
    /// Returns `StoreError::NotFound` when the cell is absent, unless the
    /// backend is configured to materialize misses (see `get_or_insert_default`).
    fn get(&self, key: &[u8], col: u64) -> Result<B>;

    /// Read a cell, creating and storing a default bitmap on a miss
    ///
    /// Backends without a default policy behave exactly like `get`.
    fn get_or_insert_default(&self, key: &[u8], col: u64) -> Result<B> {
        self.get(key, col)
    }

    /// Remove a cell; absent cells are a no-op
    fn del(&self, key: &[u8], col: u64) -> Result<()>;

    /// Feed every cell of a row to `observer`, strictly ascending by column id
    ///
    /// Cells are fetched `page_size` at a time until an empty page comes back.
    /// The scan is not a snapshot: concurrent writes to the row may or may not
    /// be observed.
    fn visit_all_columns(
        &self,
        key: &[u8],
        page_size: u32,
        observer: &mut dyn ColumnObserver<B>,
    ) -> Result<()>;
}

/// Shared argument check for scans
pub(crate) fn check_page_size(page_size: u32) -> Result<()> {
    if page_size == 0 {
        return Err(crate::StoreError::InvalidArgument(
            "page size must be at least 1".to_string(),
        ));
    }
    Ok(())
}
