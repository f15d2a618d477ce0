//! Durable Backend Tests
//!
//! Tests verify:
//! - Put/get/del round trips over the wide-column store
//! - Column key encoding (8-byte big-endian)
//! - Paged scans: completeness, ordering, page requests
//! - Corrupted values and store failures surface as IO failures
//! - Latency instrumentation on success and failure paths

use std::sync::Arc;

use colbitmap::durable::WideColumnStore;
use colbitmap::metrics::{LatencyRecorder, NoopMetrics};
use colbitmap::{
    ColumnIo, Config, DenseBitmap, DurableIo, MemoryWideColumnStore, StoreError, Table,
};
use roaring::RoaringBitmap;

// =============================================================================
// Helper Functions
// =============================================================================

type Durable = DurableIo<MemoryWideColumnStore>;

fn setup_durable() -> Durable {
    DurableIo::with_defaults(MemoryWideColumnStore::new()).unwrap()
}

fn setup_instrumented() -> (Durable, Arc<LatencyRecorder>) {
    let recorder = Arc::new(LatencyRecorder::new());
    let config = Config::builder().metrics_scope("cassandra").build();
    let durable = DurableIo::new(MemoryWideColumnStore::new(), &config, recorder.clone()).unwrap();
    (durable, recorder)
}

fn bitmap(bits: &[u32]) -> DenseBitmap {
    DenseBitmap::from_bits(128, bits.iter().copied())
}

fn get(durable: &Durable, key: &[u8], col: u64) -> colbitmap::Result<DenseBitmap> {
    durable.get(key, col)
}

fn scan(durable: &Durable, key: &[u8], page_size: u32) -> colbitmap::Result<Vec<(u64, DenseBitmap)>> {
    let mut seen = Vec::new();
    let mut observer = |_key: &[u8], col: u64, bitmap: DenseBitmap| seen.push((col, bitmap));
    durable.visit_all_columns(key, page_size, &mut observer)?;
    Ok(seen)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_put_get_round_trip() {
    let durable = setup_durable();

    durable.put(b"row1", 5, bitmap(&[0, 64, 127])).unwrap();

    assert_eq!(get(&durable, b"row1", 5).unwrap(), bitmap(&[0, 64, 127]));
}

#[test]
fn test_put_overwrites() {
    let durable = setup_durable();

    durable.put(b"row1", 5, bitmap(&[1])).unwrap();
    durable.put(b"row1", 5, bitmap(&[2])).unwrap();

    assert_eq!(get(&durable, b"row1", 5).unwrap(), bitmap(&[2]));
}

#[test]
fn test_get_missing_is_not_found() {
    let durable = setup_durable();
    durable.put(b"row1", 1, bitmap(&[1])).unwrap();

    let err = get(&durable, b"row1", 2).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { col: 2 }));

    assert!(get(&durable, b"nope", 1).unwrap_err().is_not_found());
}

#[test]
fn test_get_or_insert_default_never_materializes() {
    let durable = setup_durable();

    let err = ColumnIo::<DenseBitmap>::get_or_insert_default(&durable, b"row1", 1).unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(durable.store().total_columns(), 0);
}

#[test]
fn test_delete_then_get_is_not_found() {
    let durable = setup_durable();
    durable.put(b"row1", 5, bitmap(&[1])).unwrap();

    ColumnIo::<DenseBitmap>::del(&durable, b"row1", 5).unwrap();

    assert!(get(&durable, b"row1", 5).unwrap_err().is_not_found());
}

#[test]
fn test_delete_missing_is_noop() {
    let durable = setup_durable();

    ColumnIo::<DenseBitmap>::del(&durable, b"row1", 5).unwrap();
}

#[test]
fn test_roaring_values_round_trip() {
    let durable = setup_durable();
    let value: RoaringBitmap = [3u32, 1 << 20].into_iter().collect();

    durable.put(b"row1", 1, value.clone()).unwrap();
    let read: RoaringBitmap = durable.get(b"row1", 1).unwrap();

    assert_eq!(read, value);
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_column_key_is_big_endian_u64() {
    let durable = setup_durable();
    durable.put(b"row1", 0x0102_0304_0506_0708, bitmap(&[1])).unwrap();

    let columns = durable.store().column_slice(b"row1", None, 10).unwrap();

    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].0.as_ref(), &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_value_is_bitmap_bytes() {
    use colbitmap::Bitmap;

    let durable = setup_durable();
    let value = bitmap(&[9]);
    durable.put(b"row1", 1, value.clone()).unwrap();

    let stored = durable.store().get_column(b"row1", &1u64.to_be_bytes()).unwrap().unwrap();

    assert_eq!(stored.as_ref(), value.to_bytes().unwrap().as_slice());
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_visit_pagination_completeness() {
    let durable = setup_durable();
    let m = 25u64;
    for col in 0..m {
        durable.put(b"wide", col, bitmap(&[col as u32])).unwrap();
    }

    for page_size in [1u32, 4, 7, 24, 25, 26, 500] {
        let seen = scan(&durable, b"wide", page_size).unwrap();
        assert_eq!(seen.len(), m as usize, "page size {}", page_size);
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
        for (col, value) in seen {
            assert_eq!(value, bitmap(&[col as u32]));
        }
    }
}

#[test]
fn test_visit_fetches_pages_until_empty() {
    let durable = setup_durable();
    for col in 0..25u64 {
        durable.put(b"wide", col, bitmap(&[1])).unwrap();
    }

    scan(&durable, b"wide", 4).unwrap();

    // 7 non-empty pages (6 x 4 + 1) and the terminating empty page
    assert_eq!(durable.store().page_requests(), 8);
}

#[test]
fn test_visit_orders_numerically() {
    let durable = setup_durable();
    for col in [u64::MAX, 256, 1, 255, 1 << 40] {
        durable.put(b"row1", col, bitmap(&[1])).unwrap();
    }

    let cols: Vec<u64> = scan(&durable, b"row1", 2).unwrap().into_iter().map(|(c, _)| c).collect();

    assert_eq!(cols, vec![1, 255, 256, 1 << 40, u64::MAX]);
}

#[test]
fn test_visit_only_touches_requested_row() {
    let durable = setup_durable();
    durable.put(b"row1", 1, bitmap(&[1])).unwrap();
    durable.put(b"row2", 2, bitmap(&[2])).unwrap();

    assert_eq!(scan(&durable, b"row2", 10).unwrap(), vec![(2, bitmap(&[2]))]);
    assert!(scan(&durable, b"row3", 10).unwrap().is_empty());
}

#[test]
fn test_visit_zero_page_size_is_invalid() {
    let durable = setup_durable();

    let err = scan(&durable, b"row1", 0).unwrap_err();

    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_corrupted_value_is_io_failure() {
    let durable = setup_durable();
    durable.store().insert_raw(b"row1", &7u64.to_be_bytes(), b"not a bitmap");

    let err = get(&durable, b"row1", 7).unwrap_err();
    assert!(matches!(err, StoreError::Corrupted(_)));
    assert!(err.is_io_failure());

    let err = scan(&durable, b"row1", 10).unwrap_err();
    assert!(matches!(err, StoreError::Corrupted(_)));
}

#[test]
fn test_malformed_column_key_is_io_failure() {
    let durable = setup_durable();
    durable.store().insert_raw(b"row1", &[1, 2, 3], b"ignored");

    let err = scan(&durable, b"row1", 10).unwrap_err();

    assert!(matches!(err, StoreError::Corrupted(_)));
}

#[test]
fn test_unavailable_store_fails_every_operation() {
    let durable = setup_durable();
    durable.put(b"row1", 1, bitmap(&[1])).unwrap();
    durable.store().set_unavailable(true);

    assert!(durable.put(b"row1", 2, bitmap(&[1])).unwrap_err().is_io_failure());
    assert!(get(&durable, b"row1", 1).unwrap_err().is_io_failure());
    assert!(ColumnIo::<DenseBitmap>::del(&durable, b"row1", 1).unwrap_err().is_io_failure());
    assert!(scan(&durable, b"row1", 10).unwrap_err().is_io_failure());

    durable.store().set_unavailable(false);
    assert_eq!(get(&durable, b"row1", 1).unwrap(), bitmap(&[1]));
}

// =============================================================================
// Instrumentation Tests
// =============================================================================

#[test]
fn test_latency_recorded_per_operation_and_scope() {
    let (durable, recorder) = setup_instrumented();

    durable.put(b"row1", 1, bitmap(&[1])).unwrap();
    get(&durable, b"row1", 1).unwrap();
    get(&durable, b"row1", 2).unwrap_err();
    scan(&durable, b"row1", 10).unwrap();

    assert_eq!(recorder.stats("put", "cassandra").unwrap().count, 1);
    assert_eq!(recorder.stats("get", "cassandra").unwrap().count, 2);
    assert_eq!(recorder.stats("visit", "cassandra").unwrap().count, 1);
    assert!(recorder.stats("put", "wide-column").is_none());
}

#[test]
fn test_latency_recorded_for_del_and_flush() {
    let (durable, recorder) = setup_instrumented();
    durable.put(b"row1", 1, bitmap(&[1])).unwrap();

    ColumnIo::<DenseBitmap>::del(&durable, b"row1", 1).unwrap();

    let mut table: Table<DenseBitmap> = Table::new();
    table.entry(b"row1".to_vec()).or_default().insert(2, bitmap(&[2]));
    table.entry(b"row2".to_vec()).or_default().insert(3, bitmap(&[3]));
    durable.flush(&table).unwrap();

    assert_eq!(recorder.stats("del", "cassandra").unwrap().count, 1);
    assert_eq!(recorder.stats("flush", "cassandra").unwrap().count, 1);
    // One flush call is one sample, however many cells it writes
    assert_eq!(recorder.stats("put", "cassandra").unwrap().count, 1);
}

#[test]
fn test_flush_latency_recorded_on_batch_failure() {
    let (durable, recorder) = setup_instrumented();
    durable.store().fail_batch(1);

    let mut table: Table<DenseBitmap> = Table::new();
    table.entry(b"row1".to_vec()).or_default().insert(1, bitmap(&[1]));
    let err = durable.flush(&table).unwrap_err();

    assert!(matches!(err, StoreError::BatchFailed { .. }));
    assert_eq!(recorder.stats("flush", "cassandra").unwrap().count, 1);
}

#[test]
fn test_latency_recorded_on_failure_without_masking_it() {
    let (durable, recorder) = setup_instrumented();
    durable.store().set_unavailable(true);

    let err = durable.put(b"row1", 1, bitmap(&[1])).unwrap_err();

    assert!(matches!(err, StoreError::Backend(_)));
    assert_eq!(recorder.stats("put", "cassandra").unwrap().count, 1);
}

#[test]
fn test_latency_stats_are_consistent() {
    let (durable, recorder) = setup_instrumented();
    for col in 0..10u64 {
        durable.put(b"row1", col, bitmap(&[1])).unwrap();
    }

    let stats = recorder.stats("put", "cassandra").unwrap();

    assert_eq!(stats.count, 10);
    assert!(stats.min <= stats.mean());
    assert!(stats.mean() <= stats.max);
    assert!(stats.max <= stats.total);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_zero_batch_size_is_rejected() {
    let config = Config::builder().flush_batch_size(0).build();

    let result = DurableIo::new(MemoryWideColumnStore::new(), &config, Arc::new(NoopMetrics));

    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_zero_page_size_config_is_rejected() {
    let config = Config::builder().scan_page_size(0).build();

    assert!(matches!(config.validate(), Err(StoreError::Config(_))));
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.flush_batch_size, 1024);
    assert_eq!(config.scan_page_size, 256);
    assert_eq!(config.metrics_scope, "wide-column");
    assert!(config.validate().is_ok());
    assert_eq!(setup_durable().batch_size(), 1024);
}
