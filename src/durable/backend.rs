//! Durable backend
//!
//! `ColumnIo` over a `WideColumnStore`, plus the bulk flush path.

use std::mem;
use std::sync::Arc;

use bytes::Bytes;

use crate::bitmap::Bitmap;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::io::{check_page_size, decode_column, encode_column, ColumnIo, ColumnObserver, Table};
use crate::metrics::{LatencyTimer, MetricName, MetricsSink, NoopMetrics};

use super::store::{MutationBatch, WideColumnStore};

/// Outcome of a successful bulk flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Batch calls issued
    pub batches: usize,
    /// Column writes committed
    pub mutations: usize,
}

/// Durable `ColumnIo` backend
///
/// Misses are always `StoreError::NotFound`; nothing is materialized at this
/// layer. Every operation blocks for the duration of the store call.
pub struct DurableIo<S> {
    /// Client for the underlying column family
    store: S,

    /// Max mutations per bulk-flush batch
    batch_size: usize,

    /// Where operation latencies go
    metrics: Arc<dyn MetricsSink>,

    put_metric: MetricName,
    get_metric: MetricName,
    del_metric: MetricName,
    visit_metric: MetricName,
    flush_metric: MetricName,
}

impl<S: WideColumnStore> DurableIo<S> {
    /// Create a backend over `store`
    ///
    /// Fails with `StoreError::Config` if the config is unusable.
    pub fn new(store: S, config: &Config, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
        config.validate()?;

        let scope = config.metrics_scope.as_str();
        Ok(Self {
            store,
            batch_size: config.flush_batch_size,
            metrics,
            put_metric: MetricName::new("put", scope),
            get_metric: MetricName::new("get", scope),
            del_metric: MetricName::new("del", scope),
            visit_metric: MetricName::new("visit", scope),
            flush_metric: MetricName::new("flush", scope),
        })
    }

    /// Default config, metrics discarded
    pub fn with_defaults(store: S) -> Result<Self> {
        Self::new(store, &Config::default(), Arc::new(NoopMetrics))
    }

    /// Max mutations per bulk-flush batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The underlying store client
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Bulk Flush
    // =========================================================================

    /// Overwrite every cell of `data` in batches of at most `batch_size`
    ///
    /// Every cell is encoded before the first batch is sent, so an encoding
    /// failure leaves the store untouched. Batches run sequentially. On the
    /// first failing batch the remaining ones are abandoned and
    /// `StoreError::BatchFailed` reports how many mutations the failing batch
    /// carried and how many earlier batches had already committed. Those
    /// earlier writes stay applied.
    pub fn flush<B: Bitmap>(&self, data: &Table<B>) -> Result<FlushReport> {
        let _timer = LatencyTimer::start(&self.metrics, &self.flush_metric);

        let batches = self.encode_batches(data)?;

        let mut report = FlushReport::default();
        for batch in batches {
            self.try_batch(batch, &mut report)?;
        }

        tracing::info!(
            batches = report.batches,
            mutations = report.mutations,
            "bulk flush complete"
        );
        Ok(report)
    }

    /// Group encoded cells into batches of at most `batch_size` mutations
    fn encode_batches<B: Bitmap>(&self, data: &Table<B>) -> Result<Vec<MutationBatch>> {
        let mut batches = Vec::new();
        let mut batch = MutationBatch::with_capacity(self.batch_size);

        for (row, columns) in data {
            for (col, bitmap) in columns {
                batch.put_column(
                    row,
                    Bytes::copy_from_slice(&encode_column(*col)),
                    bitmap.to_bytes()?,
                );

                if batch.len() >= self.batch_size {
                    batches.push(mem::replace(
                        &mut batch,
                        MutationBatch::with_capacity(self.batch_size),
                    ));
                }
            }
        }

        if !batch.is_empty() {
            batches.push(batch);
        }
        Ok(batches)
    }

    fn try_batch(&self, batch: MutationBatch, report: &mut FlushReport) -> Result<()> {
        let attempted = batch.len();

        if let Err(e) = self.store.execute_batch(batch) {
            tracing::error!(
                attempted,
                applied = report.mutations,
                error = %e,
                "bulk flush batch failed"
            );
            return Err(StoreError::BatchFailed {
                attempted,
                applied: report.mutations,
                source: Box::new(e),
            });
        }

        report.batches += 1;
        report.mutations += attempted;
        tracing::debug!(attempted, batches = report.batches, "batch committed");
        Ok(())
    }
}

impl<S, B> ColumnIo<B> for DurableIo<S>
where
    S: WideColumnStore,
    B: Bitmap,
{
    fn put(&self, key: &[u8], col: u64, bitmap: B) -> Result<()> {
        let _timer = LatencyTimer::start(&self.metrics, &self.put_metric);
        tracing::trace!(col, "put");

        let value = Bytes::from(bitmap.to_bytes()?);
        self.store.put_column(key, &encode_column(col), value)
    }

    fn get(&self, key: &[u8], col: u64) -> Result<B> {
        let _timer = LatencyTimer::start(&self.metrics, &self.get_metric);
        tracing::trace!(col, "get");

        match self.store.get_column(key, &encode_column(col))? {
            Some(value) => B::from_bytes(&value),
            None => Err(StoreError::NotFound { col }),
        }
    }

    fn del(&self, key: &[u8], col: u64) -> Result<()> {
        let _timer = LatencyTimer::start(&self.metrics, &self.del_metric);
        tracing::trace!(col, "del");

        self.store.delete_column(key, &encode_column(col))
    }

    fn visit_all_columns(
        &self,
        key: &[u8],
        page_size: u32,
        observer: &mut dyn ColumnObserver<B>,
    ) -> Result<()> {
        let _timer = LatencyTimer::start(&self.metrics, &self.visit_metric);
        check_page_size(page_size)?;

        let mut after: Option<Bytes> = None;
        let mut pages = 0usize;
        loop {
            let page = self
                .store
                .column_slice(key, after.as_deref(), page_size as usize)?;
            if page.is_empty() {
                break;
            }
            pages += 1;
            tracing::debug!(page = pages, columns = page.len(), "fetched column page");

            for (column, value) in page {
                let col = decode_column(&column)?;
                let bitmap = B::from_bytes(&value)?;
                observer.observe(key, col, bitmap);
                after = Some(column);
            }
        }

        Ok(())
    }
}
