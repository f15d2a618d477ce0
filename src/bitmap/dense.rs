//! Dense bitmap
//!
//! Fixed-width bitmap backed by `u64` words.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────────────────────────┬────────────┐
//! │ bincode(num_bits: u64, words: [u64]) │ CRC32 (4)  │
//! └──────────────────────────────────────┴────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

use super::{Bitmap, BitmapFactory};

/// Size of the trailing checksum
const CRC_SIZE: usize = 4;

const WORD_BITS: u64 = 64;

/// Every `u32` position addressable
const MAX_BITS: u64 = 1 << 32;

/// Fixed-width bitmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseBitmap {
    num_bits: u64,
    words: Vec<u64>,
}

impl DenseBitmap {
    /// All-zero bitmap holding `num_bits` bits
    pub fn new(num_bits: u32) -> Self {
        let num_bits = num_bits as u64;
        Self {
            num_bits,
            words: vec![0; Self::word_count(num_bits)],
        }
    }

    /// Bitmap of `num_bits` bits with the given positions set
    pub fn from_bits(num_bits: u32, bits: impl IntoIterator<Item = u32>) -> Self {
        let mut bitmap = Self::new(num_bits);
        for bit in bits {
            bitmap.insert(bit);
        }
        bitmap
    }

    /// Set a bit, widening the bitmap if the position is past the end
    pub fn insert(&mut self, bit: u32) {
        let bit = bit as u64;
        if bit >= self.num_bits {
            self.widen(bit + 1);
        }
        self.words[(bit / WORD_BITS) as usize] |= 1u64 << (bit % WORD_BITS);
    }

    /// Check whether a bit is set
    pub fn contains(&self, bit: u32) -> bool {
        let bit = bit as u64;
        if bit >= self.num_bits {
            return false;
        }
        self.words[(bit / WORD_BITS) as usize] & (1u64 << (bit % WORD_BITS)) != 0
    }

    /// Number of set bits
    pub fn cardinality(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Width in bits
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// True when no bit is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Set positions in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_bits)
            .map(|bit| bit as u32)
            .filter(move |&bit| self.contains(bit))
    }

    /// Grow to `num_bits`; the new tail is allocated zeroed, not written
    fn widen(&mut self, num_bits: u64) {
        let mut words = vec![0u64; Self::word_count(num_bits)];
        words[..self.words.len()].copy_from_slice(&self.words);
        self.words = words;
        self.num_bits = num_bits;
    }

    fn word_count(num_bits: u64) -> usize {
        num_bits.div_ceil(WORD_BITS) as usize
    }
}

impl Bitmap for DenseBitmap {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes =
            bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let crc = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&crc.to_le_bytes());
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CRC_SIZE {
            return Err(StoreError::Corrupted(format!(
                "dense bitmap too short: {} bytes",
                bytes.len()
            )));
        }

        // Verify checksum before trusting the payload
        let (payload, crc_bytes) = bytes.split_at(bytes.len() - CRC_SIZE);
        let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let computed_crc = crc32fast::hash(payload);
        if stored_crc != computed_crc {
            return Err(StoreError::Corrupted(format!(
                "dense bitmap CRC mismatch: stored={:#010x}, computed={:#010x}",
                stored_crc, computed_crc
            )));
        }

        let bitmap: DenseBitmap =
            bincode::deserialize(payload).map_err(|e| StoreError::Corrupted(e.to_string()))?;

        if bitmap.num_bits > MAX_BITS {
            return Err(StoreError::Corrupted(format!(
                "dense bitmap claims {} bits",
                bitmap.num_bits
            )));
        }

        if bitmap.words.len() != Self::word_count(bitmap.num_bits) {
            return Err(StoreError::Corrupted(format!(
                "dense bitmap of {} bits carries {} words",
                bitmap.num_bits,
                bitmap.words.len()
            )));
        }

        Ok(bitmap)
    }

    fn mutating_or(&mut self, other: &Self) {
        if other.num_bits > self.num_bits {
            self.widen(other.num_bits);
        }
        for (word, &theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= theirs;
        }
    }
}

/// Produces all-zero `DenseBitmap`s of a fixed default width
#[derive(Debug, Clone, Copy)]
pub struct DenseBitmapFactory {
    bits: u32,
}

impl DenseBitmapFactory {
    pub fn new(bits: u32) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }
}

impl BitmapFactory<DenseBitmap> for DenseBitmapFactory {
    fn new_bitmap(&self) -> DenseBitmap {
        DenseBitmap::new(self.bits)
    }

    fn new_bitmap_with_bits(&self, num_bits: u32) -> DenseBitmap {
        DenseBitmap::new(num_bits)
    }
}
