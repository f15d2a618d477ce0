//! Durable Module
//!
//! `ColumnIo` backend on top of a wide-column store.
//!
//! ## Responsibilities
//! - Map cells onto (row key, column key) pairs of the store
//! - Page through wide rows without loading them whole
//! - Bulk-write a table snapshot in size-bounded batches
//! - Record per-operation latency into an injected `MetricsSink`
//!
//! ## Cell Layout
//! ```text
//! ┌──────────────┬─────────────────────────┬──────────────────────────┐
//! │ Row key      │ Column key (8, BE u64)  │ Value (Bitmap::to_bytes) │
//! └──────────────┴─────────────────────────┴──────────────────────────┘
//! ```
//! Big-endian column keys make the store's byte order match column id order.

mod backend;
mod memory;
mod store;

pub use backend::{DurableIo, FlushReport};
pub use memory::MemoryWideColumnStore;
pub use store::{ColumnMutation, MutationBatch, WideColumnStore};
