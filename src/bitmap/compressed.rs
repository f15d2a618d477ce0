//! Roaring bitmap adapter
//!
//! Lets `roaring::RoaringBitmap` live in cells. Uses the portable roaring
//! serialization, so values stay readable by other roaring implementations.

use roaring::RoaringBitmap;

use crate::error::{Result, StoreError};

use super::{Bitmap, BitmapFactory};

impl Bitmap for RoaringBitmap {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.serialized_size());
        self.serialize_into(&mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        RoaringBitmap::deserialize_from(bytes).map_err(|e| StoreError::Corrupted(e.to_string()))
    }

    fn mutating_or(&mut self, other: &Self) {
        *self |= other;
    }
}

/// Produces empty roaring bitmaps; roaring containers grow on demand,
/// so the size hint is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct RoaringBitmapFactory;

impl BitmapFactory<RoaringBitmap> for RoaringBitmapFactory {
    fn new_bitmap(&self) -> RoaringBitmap {
        RoaringBitmap::new()
    }

    fn new_bitmap_with_bits(&self, _num_bits: u32) -> RoaringBitmap {
        RoaringBitmap::new()
    }
}
