//! Bitmap Module
//!
//! The bitmap capability the store is built on.
//!
//! ## Responsibilities
//! - Byte serialization (what the durable backend stores per cell)
//! - In-place bitwise OR (what a merge flush applies)
//! - Factory construction of empty bitmaps (lazy materialization)
//!
//! The store never looks inside a bitmap. Two implementations ship with the crate:
//! - `DenseBitmap`: fixed-width word vector with a checksummed wire form
//! - `roaring::RoaringBitmap`: compressed, for sparse postings

mod dense;
mod compressed;

pub use self::dense::{DenseBitmap, DenseBitmapFactory};
pub use self::compressed::RoaringBitmapFactory;

use crate::error::Result;

/// Opaque bit-vector value stored in every cell
pub trait Bitmap: Clone + Send + Sync + 'static {
    /// Serialize to the bytes written as a column value
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Decode a column value; malformed input is `StoreError::Corrupted`
    fn from_bytes(bytes: &[u8]) -> Result<Self>;

    /// `self = self | other`
    fn mutating_or(&mut self, other: &Self);
}

/// Builds empty bitmaps for cells that have never been written
pub trait BitmapFactory<B: Bitmap>: Send + Sync {
    /// An all-zero bitmap of the factory's default width
    fn new_bitmap(&self) -> B;

    /// An all-zero bitmap sized for `num_bits` bits
    fn new_bitmap_with_bits(&self, num_bits: u32) -> B;
}
