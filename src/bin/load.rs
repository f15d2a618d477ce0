//! colbitmap Load Generator
//!
//! Stages synthetic postings in a buffer from several writer threads, merges
//! them into a durable backend over the in-process wide-column store, then
//! scans every row back and prints per-operation latencies.

use std::sync::Arc;

use clap::Parser;
use colbitmap::durable::FlushReport;
use colbitmap::metrics::LatencyRecorder;
use colbitmap::{
    Bitmap, BufferIo, ColumnIo, Config, DenseBitmap, DenseBitmapFactory, DurableIo,
    MemoryWideColumnStore, StoreError,
};
use tracing_subscriber::{fmt, EnvFilter};

/// colbitmap load generator
#[derive(Parser, Debug)]
#[command(name = "colbitmap-load")]
#[command(about = "Drive the buffer → merge → durable path with synthetic postings")]
#[command(version)]
struct Args {
    /// Number of row keys
    #[arg(short, long, default_value = "64")]
    rows: u32,

    /// Columns per row
    #[arg(short, long, default_value = "512")]
    cols: u64,

    /// Bits per bitmap
    #[arg(short, long, default_value = "65536")]
    bits: u32,

    /// Bits set per cell per round
    #[arg(long, default_value = "8")]
    bits_per_cell: u32,

    /// Concurrent writer threads
    #[arg(short, long, default_value = "4")]
    writers: u32,

    /// Buffer → durable flush rounds
    #[arg(long, default_value = "2")]
    rounds: u32,

    /// Max mutations per bulk batch
    #[arg(long, default_value = "1024")]
    batch_size: usize,

    /// Columns per page when scanning rows back
    #[arg(long, default_value = "256")]
    page_size: u32,

    /// Overwrite with the bulk batch path instead of merging
    #[arg(long)]
    bulk: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,colbitmap=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("colbitmap load generator v{}", colbitmap::VERSION);
    tracing::info!(
        rows = args.rows,
        cols = args.cols,
        bits = args.bits,
        writers = args.writers,
        rounds = args.rounds,
        "starting"
    );

    if let Err(e) = run(&args) {
        tracing::error!("Load run failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> colbitmap::Result<()> {
    let config = Config::builder()
        .flush_batch_size(args.batch_size)
        .scan_page_size(args.page_size)
        .bitmap_bits(args.bits)
        .metrics_scope("memory-wide-column")
        .build();

    let recorder = Arc::new(LatencyRecorder::new());
    let durable = DurableIo::new(MemoryWideColumnStore::new(), &config, recorder.clone())?;
    let buffer: BufferIo<DenseBitmap> =
        BufferIo::new().with_bitmap_factory(DenseBitmapFactory::new(config.bitmap_bits));

    for round in 0..args.rounds {
        stage_round(&buffer, args, round)?;
        tracing::info!(
            round,
            rows = buffer.approximate_row_count(),
            cells = buffer.cell_count(),
            "round staged"
        );

        if args.bulk {
            let FlushReport { batches, mutations } = durable.flush(&buffer.snapshot())?;
            buffer.clear();
            tracing::info!(round, batches, mutations, "bulk flushed");
        } else {
            let stats = buffer.flush_to(&durable)?;
            tracing::info!(round, rows = stats.rows, cells = stats.cells, "merged");
        }
    }

    // Scan back
    let mut cells = 0u64;
    let mut set_bits = 0u64;
    for row in 0..args.rows {
        let key = row_key(row);
        let mut observer = |_key: &[u8], _col: u64, bitmap: DenseBitmap| {
            cells += 1;
            set_bits += bitmap.cardinality();
        };
        ColumnIo::<DenseBitmap>::visit_all_columns(&durable, &key, config.scan_page_size, &mut observer)?;
    }
    tracing::info!(cells, set_bits, "scan complete");

    for (name, stats) in recorder.snapshot() {
        tracing::info!(
            operation = name.operation,
            scope = %name.scope,
            count = stats.count,
            mean_us = stats.mean().as_micros() as u64,
            max_us = stats.max.as_micros() as u64,
            "latency"
        );
    }

    Ok(())
}

/// Write one round of postings from `args.writers` scoped threads
fn stage_round(buffer: &BufferIo<DenseBitmap>, args: &Args, round: u32) -> colbitmap::Result<()> {
    let outcome = crossbeam::thread::scope(|scope| -> colbitmap::Result<()> {
        let handles: Vec<_> = (0..args.writers)
            .map(|writer| scope.spawn(move |_| write_rows(buffer, args, round, writer)))
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| StoreError::Backend("writer thread panicked".to_string()))??;
        }
        Ok(())
    });

    outcome.map_err(|_| StoreError::Backend("writer scope panicked".to_string()))?
}

/// Rows are striped across writers so every writer owns distinct rows
fn write_rows(
    buffer: &BufferIo<DenseBitmap>,
    args: &Args,
    round: u32,
    writer: u32,
) -> colbitmap::Result<()> {
    for row in (writer..args.rows).step_by(args.writers.max(1) as usize) {
        let key = row_key(row);
        for col in 0..args.cols {
            let mut bitmap = buffer.get_or_insert_default(&key, col)?;
            let mut delta = DenseBitmap::new(args.bits);
            for i in 0..args.bits_per_cell {
                delta.insert(posting(row, col, round, i, args.bits));
            }
            bitmap.mutating_or(&delta);
            buffer.put(&key, col, bitmap)?;
        }
    }
    Ok(())
}

fn row_key(row: u32) -> Vec<u8> {
    format!("row{:06}", row).into_bytes()
}

/// Deterministic spread of bit positions
fn posting(row: u32, col: u64, round: u32, i: u32, bits: u32) -> u32 {
    let mixed = (row as u64)
        .wrapping_mul(0x9E37_79B9)
        .wrapping_add(col.wrapping_mul(0x85EB_CA6B))
        .wrapping_add((round as u64) << 20)
        .wrapping_add(i as u64 * 7919);
    (mixed % bits.max(1) as u64) as u32
}
