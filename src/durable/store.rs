//! Wide-column store client interface
//!
//! The narrow surface the durable backend needs from a distributed
//! wide-column store. Wire protocol, replication and consistency levels live
//! behind it.

use bytes::Bytes;

use crate::error::Result;

/// Client for a wide-column store holding one column family
///
/// Rows are addressed by arbitrary byte keys, columns within a row by byte
/// keys kept in ascending unsigned byte order. Every call blocks until the
/// store acknowledges it.
pub trait WideColumnStore: Send + Sync {
    /// Write a single column
    fn put_column(&self, row: &[u8], column: &[u8], value: Bytes) -> Result<()>;

    /// Read a single column; `None` if absent
    fn get_column(&self, row: &[u8], column: &[u8]) -> Result<Option<Bytes>>;

    /// Delete a single column; absent columns are not an error
    fn delete_column(&self, row: &[u8], column: &[u8]) -> Result<()>;

    /// Up to `limit` columns of `row` strictly after `after`, ascending
    fn column_slice(
        &self,
        row: &[u8],
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<(Bytes, Bytes)>>;

    /// Apply a multi-row batch of column writes
    fn execute_batch(&self, batch: MutationBatch) -> Result<()>;
}

/// A single column write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMutation {
    pub row: Vec<u8>,
    pub column: Bytes,
    pub value: Bytes,
}

/// Multi-row group of column writes sent in one store call
#[derive(Debug, Default, Clone)]
pub struct MutationBatch {
    mutations: Vec<ColumnMutation>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            mutations: Vec::with_capacity(capacity),
        }
    }

    /// Queue a column write
    pub fn put_column(&mut self, row: &[u8], column: impl Into<Bytes>, value: impl Into<Bytes>) {
        self.mutations.push(ColumnMutation {
            row: row.to_vec(),
            column: column.into(),
            value: value.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnMutation> {
        self.mutations.iter()
    }

    pub fn into_mutations(self) -> Vec<ColumnMutation> {
        self.mutations
    }
}
