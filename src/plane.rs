use crate::error::{TransformError, TransformResult};
use crate::DCTSIZE2;

/// Alignment of the f32 block buffers, matching the widest SIMD lane width
/// used by the transform (8 lanes of f32).
pub const BLOCK_ALIGN: usize = 32;

/// One quantized coefficient block in natural (row-major) order.
pub type CoeffBlock = [i16; DCTSIZE2];

/// An 8x8 block of f32 values aligned for SIMD loads.
///
/// Used for the DCT output and scratch buffers. Per-block pixel data flows
/// through these; they are created once per invocation and reused across
/// blocks.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(32))]
pub struct AlignedBlock(pub [f32; DCTSIZE2]);

impl Default for AlignedBlock {
    fn default() -> Self {
        AlignedBlock([0.0; DCTSIZE2])
    }
}

impl AlignedBlock {
    pub(crate) fn check_alignment(&self, what: &'static str) -> TransformResult<()> {
        let addr = self.0.as_ptr() as usize;
        if addr % BLOCK_ALIGN != 0 {
            return Err(TransformError::AlignmentError {
                what,
                addr,
                required: BLOCK_ALIGN,
            });
        }
        Ok(())
    }
}

/// Borrowed view of a planar row buffer of f32 samples.
///
/// Rows are `stride` floats apart. The buffer is assumed pre-padded by the
/// preprocessing stage so that every 8x8 tile inside the block grid is fully
/// readable; there are no partial blocks at this layer.
#[derive(Clone, Copy, Debug)]
pub struct PlaneView<'a> {
    data: &'a [f32],
    stride: usize,
}

impl<'a> PlaneView<'a> {
    pub fn new(data: &'a [f32], stride: usize) -> Self {
        debug_assert!(stride > 0);
        PlaneView { data, stride }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of complete rows in the view
    #[inline]
    pub fn rows(&self) -> usize {
        self.data.len() / self.stride
    }

    #[inline]
    pub fn row(&self, y: usize) -> &'a [f32] {
        &self.data[y * self.stride..][..self.stride]
    }

    /// Strided suffix starting at sample (y, x), for the block loader.
    #[inline]
    pub(crate) fn tile(&self, y: usize, x: usize) -> &'a [f32] {
        &self.data[y * self.stride + x..]
    }
}

/// Coefficient storage for one component, addressed by block row and column.
///
/// Stands in for libjpeg's virtual block array: the driver requests write
/// access to a bounded range of block rows per MCU row and releases it when
/// the borrow ends, so a paging implementation could swap rows to disk
/// between invocations. Views must be re-acquired each invocation, never
/// cached.
#[derive(Debug)]
pub struct VirtualBlockArray {
    width_in_blocks: usize,
    height_in_blocks: usize,
    blocks: Vec<CoeffBlock>,
}

impl VirtualBlockArray {
    pub fn new(width_in_blocks: usize, height_in_blocks: usize) -> Self {
        VirtualBlockArray {
            width_in_blocks,
            height_in_blocks,
            blocks: vec![[0i16; DCTSIZE2]; width_in_blocks * height_in_blocks],
        }
    }

    #[inline]
    pub fn width_in_blocks(&self) -> usize {
        self.width_in_blocks
    }

    #[inline]
    pub fn height_in_blocks(&self) -> usize {
        self.height_in_blocks
    }

    /// Borrows `n_rows` rows of blocks starting at block row `by0` for
    /// writing. The returned view holds `n_rows * width_in_blocks` blocks.
    pub fn access(&mut self, by0: usize, n_rows: usize) -> TransformResult<&mut [CoeffBlock]> {
        let end = by0.checked_add(n_rows).ok_or(TransformError::ShapeMismatch {
            what: "coefficient array rows",
            needed: usize::MAX,
            actual: self.height_in_blocks,
        })?;
        if end > self.height_in_blocks {
            return Err(TransformError::ShapeMismatch {
                what: "coefficient array rows",
                needed: end,
                actual: self.height_in_blocks,
            });
        }
        Ok(&mut self.blocks[by0 * self.width_in_blocks..end * self.width_in_blocks])
    }

    /// Read access to a single block, natural order.
    #[inline]
    pub fn block(&self, by: usize, bx: usize) -> &CoeffBlock {
        &self.blocks[by * self.width_in_blocks + bx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_view_rows() {
        let data: Vec<f32> = (0..64).map(|v| v as f32).collect();
        let plane = PlaneView::new(&data, 16);
        assert_eq!(plane.rows(), 4);
        assert_eq!(plane.row(1)[0], 16.0);
        assert_eq!(plane.tile(1, 8)[0], 24.0);
    }

    #[test]
    fn block_array_access_bounds() {
        let mut ba = VirtualBlockArray::new(4, 3);
        assert_eq!(ba.access(0, 3).unwrap().len(), 12);
        assert_eq!(ba.access(2, 1).unwrap().len(), 4);
        assert!(ba.access(2, 2).is_err());
    }

    #[test]
    fn aligned_block_is_aligned() {
        let block = AlignedBlock::default();
        assert!(block.check_alignment("block").is_ok());
    }
}
