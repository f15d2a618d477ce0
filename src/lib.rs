//! # colbitmap
//!
//! A column-oriented bitmap store: (row key, column id) → bitmap, used as the
//! storage layer for bitmap and inverted indexes.
//! - One storage contract (`ColumnIo`) for every backend
//! - In-memory buffer with optional lazy materialization of missing cells
//! - Durable backend over a wide-column store, with paged row scans and
//!   size-bounded bulk writes
//! - Merge flush that ORs buffered deltas into durable state
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Producers (index builders)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  put / get / del / visit_all_columns
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │  BufferIo   │          │  DurableIo   │──► MetricsSink
//!   │ (in-memory) │          │ (wide-column)│
//!   └──────┬──────┘          └──────▲───────┘
//!          │                        │
//!          └──── merge::flush_to ───┘
//!                (current | delta)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod bitmap;
pub mod io;
pub mod buffer;
pub mod durable;
pub mod metrics;
pub mod merge;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use bitmap::{Bitmap, BitmapFactory, DenseBitmap, DenseBitmapFactory};
pub use io::{ColumnIo, ColumnObserver, Row, Table};
pub use buffer::BufferIo;
pub use durable::{DurableIo, MemoryWideColumnStore, WideColumnStore};
pub use merge::{flush_to, MergeStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of colbitmap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
