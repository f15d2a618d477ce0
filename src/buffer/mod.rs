//! Buffer Module
//!
//! In-memory staging area for bitmap writes.
//!
//! ## Responsibilities
//! - Fast put/get/del/scan through the `ColumnIo` contract
//! - Optional lazy materialization of missing cells via a `BitmapFactory`
//! - Snapshot + clear for flushing into a durable backend
//!
//! ## Data Structure Choice
//! ```text
//! RwLock<BTreeMap<row key, Arc<Mutex<BTreeMap<column id, bitmap>>>>>
//! ```
//! - Outer map ordered by row key; the write lock is taken only to insert a
//!   missing row, so writers on unrelated rows never serialize on each other
//! - Each row has its own mutex; cell operations lock only their row

mod table;

pub use table::BufferIo;
