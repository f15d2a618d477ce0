//! Configuration for colbitmap
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, StoreError};

/// Main configuration for a colbitmap deployment
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Durable Backend Configuration
    // -------------------------------------------------------------------------
    /// Max mutations per bulk-flush batch sent to the wide-column store
    pub flush_batch_size: usize,

    /// Columns fetched per page when scanning a row
    pub scan_page_size: u32,

    /// Scope label attached to every latency metric (the backend's name)
    pub metrics_scope: String,

    // -------------------------------------------------------------------------
    // Bitmap Configuration
    // -------------------------------------------------------------------------
    /// Width of the default bitmap produced by factories
    pub bitmap_bits: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_batch_size: 1024,
            scan_page_size: 256,
            metrics_scope: "wide-column".to_string(),
            bitmap_bits: 64 * 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject values no backend can operate with
    pub fn validate(&self) -> Result<()> {
        if self.flush_batch_size == 0 {
            return Err(StoreError::Config(
                "flush_batch_size must be at least 1".to_string(),
            ));
        }
        if self.scan_page_size == 0 {
            return Err(StoreError::Config(
                "scan_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the max number of mutations per bulk-flush batch
    pub fn flush_batch_size(mut self, size: usize) -> Self {
        self.config.flush_batch_size = size;
        self
    }

    /// Set the page size used for row scans
    pub fn scan_page_size(mut self, size: u32) -> Self {
        self.config.scan_page_size = size;
        self
    }

    /// Set the scope label for latency metrics
    pub fn metrics_scope(mut self, scope: impl Into<String>) -> Self {
        self.config.metrics_scope = scope.into();
        self
    }

    /// Set the default bitmap width (in bits)
    pub fn bitmap_bits(mut self, bits: u32) -> Self {
        self.config.bitmap_bits = bits;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
