//! Merge flush
//!
//! Folds a buffer into any `ColumnIo` target by OR-ing each buffered bitmap
//! into the target's current value, then empties the buffer.
//!
//! ## Semantics
//! - Per cell: `target = current | delta`, where an absent cell reads as all
//!   zeros (so the result is `delta`), or as the target's materialized default
//!   when the target has one
//! - No atomicity across cells or rows. A failure part-way leaves the target
//!   partially merged and the buffer untouched; re-running is safe because
//!   `v | d | d == v | d`
//!
//! ## Known Hazard
//! The buffer is merged from a snapshot and cleared once the pass completes.
//! A put that lands on the buffer after its row was snapshotted but before
//! the clear is lost.

use crate::bitmap::Bitmap;
use crate::buffer::BufferIo;
use crate::error::{Result, StoreError};
use crate::io::ColumnIo;

/// Counts from a completed merge flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Non-empty buffer rows merged
    pub rows: usize,
    /// Cells merged
    pub cells: usize,
}

/// Merge every cell of `source` into `target`, then clear `source`
pub fn flush_to<B: Bitmap>(source: &BufferIo<B>, target: &dyn ColumnIo<B>) -> Result<MergeStats> {
    let snapshot = source.snapshot();
    let mut stats = MergeStats::default();

    tracing::debug!(rows = snapshot.len(), "merge flush started");

    for (key, row) in &snapshot {
        if row.is_empty() {
            continue;
        }

        for (col, delta) in row {
            let merged = match target.get_or_insert_default(key, *col) {
                Ok(mut current) => {
                    current.mutating_or(delta);
                    current
                }
                // Absent reads as all zeros: 0 | delta == delta
                Err(StoreError::NotFound { .. }) => delta.clone(),
                Err(e) => return Err(aborted(e, &stats)),
            };

            target
                .put(key, *col, merged)
                .map_err(|e| aborted(e, &stats))?;
            stats.cells += 1;
        }
        stats.rows += 1;
    }

    source.clear();

    tracing::info!(rows = stats.rows, cells = stats.cells, "merge flush complete");
    Ok(stats)
}

fn aborted(error: StoreError, stats: &MergeStats) -> StoreError {
    tracing::warn!(
        rows_done = stats.rows,
        cells_done = stats.cells,
        error = %error,
        "merge flush aborted, buffer kept"
    );
    error
}
