//! Per-component driver: walks one MCU row of the frame, transforming and
//! quantizing every 8x8 block into the component's coefficient array.

use log::{debug, trace};

use crate::dct::transform_from_pixels;
use crate::error::{TransformError, TransformResult};
use crate::plane::{AlignedBlock, PlaneView, VirtualBlockArray};
use crate::quantize::{quantize_block, quantize_block_no_aq, zero_bias_for, K_DC_BIAS};
use crate::simd::SimdVector;
use crate::{DCTSIZE, DCTSIZE2};

/// Everything the transform stage needs to know about one component.
///
/// `h_factor`/`v_factor` are the stride multipliers that map this
/// component's block grid onto the quantization field, which is sampled at
/// the resolution of the largest component.
pub struct ComponentDescriptor<'a> {
    pub width_in_blocks: usize,
    pub height_in_blocks: usize,
    pub h_samp_factor: usize,
    pub v_samp_factor: usize,
    pub h_factor: usize,
    pub v_factor: usize,
    /// Reciprocal quantization multipliers, natural order
    pub quant_mul: &'a [f32; DCTSIZE2],
    /// Per-component scale applied to the quant-field value when computing
    /// the zero-bias threshold
    pub zero_bias_mul: f32,
    /// Downsampled, level-shifted, padded samples for this component
    pub row_buffer: PlaneView<'a>,
}

/// Input context for [`compute_dct_coefficients`], covering one MCU row.
pub struct DctContext<'a> {
    pub components: &'a [ComponentDescriptor<'a>],
    /// One coefficient array per component
    pub coeff_buffers: &'a mut [VirtualBlockArray],
    /// Index of the MCU row to transform
    pub next_imcu_row: usize,
    pub use_adaptive_quantization: bool,
    /// Required when adaptive quantization is enabled
    pub quant_field: Option<PlaneView<'a>>,
}

impl DctContext<'_> {
    /// Checks every shape and sampling invariant before any block is
    /// transformed. Also called by [`compute_dct_coefficients`].
    pub fn validate(&self) -> TransformResult<()> {
        if self.coeff_buffers.len() != self.components.len() {
            return Err(TransformError::ShapeMismatch {
                what: "coefficient buffers",
                needed: self.components.len(),
                actual: self.coeff_buffers.len(),
            });
        }
        if self.use_adaptive_quantization && self.quant_field.is_none() {
            return Err(TransformError::InvariantBroken(
                "adaptive quantization enabled without a quant field",
            ));
        }
        for (comp, buffer) in self.components.iter().zip(self.coeff_buffers.iter()) {
            if comp.v_samp_factor == 0 || comp.h_samp_factor == 0 {
                return Err(TransformError::InvariantBroken("sampling factor is zero"));
            }
            let by0 = self.next_imcu_row * comp.v_samp_factor;
            if by0 >= comp.height_in_blocks {
                return Err(TransformError::InvariantBroken(
                    "MCU row starts past the bottom of the block grid",
                ));
            }
            if buffer.width_in_blocks() < comp.width_in_blocks
                || buffer.height_in_blocks() < comp.height_in_blocks
            {
                return Err(TransformError::ShapeMismatch {
                    what: "coefficient array",
                    needed: comp.width_in_blocks * comp.height_in_blocks,
                    actual: buffer.width_in_blocks() * buffer.height_in_blocks(),
                });
            }
            if comp.row_buffer.stride() < DCTSIZE * comp.width_in_blocks {
                return Err(TransformError::ShapeMismatch {
                    what: "row buffer stride",
                    needed: DCTSIZE * comp.width_in_blocks,
                    actual: comp.row_buffer.stride(),
                });
            }
            if comp.row_buffer.rows() < DCTSIZE * comp.height_in_blocks {
                return Err(TransformError::ShapeMismatch {
                    what: "row buffer rows",
                    needed: DCTSIZE * comp.height_in_blocks,
                    actual: comp.row_buffer.rows(),
                });
            }
            if let Some(field) = self
                .quant_field
                .as_ref()
                .filter(|_| self.use_adaptive_quantization)
            {
                // Highest row/column the relq lookup will touch
                let max_row = (comp.height_in_blocks - 1) * comp.v_factor;
                let max_col = (comp.width_in_blocks - 1) * comp.h_factor;
                if field.rows() <= max_row {
                    return Err(TransformError::ShapeMismatch {
                        what: "quant field rows",
                        needed: max_row + 1,
                        actual: field.rows(),
                    });
                }
                if field.stride() <= max_col {
                    return Err(TransformError::ShapeMismatch {
                        what: "quant field stride",
                        needed: max_col + 1,
                        actual: field.stride(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Transforms and quantizes one MCU row of every component.
///
/// Dispatches to the widest SIMD backend the CPU supports, falling back to
/// the scalar kernels. Output is deterministic for a given input and
/// backend; blocks are independent of each other.
pub fn compute_dct_coefficients(ctx: &mut DctContext<'_>) -> TransformResult<()> {
    ctx.validate()?;

    #[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            debug!("dct: using avx2 backend");
            return unsafe { crate::avx2::compute_coefficients_avx2(ctx) };
        }
        if is_x86_feature_detected!("sse4.1") {
            debug!("dct: using sse4.1 backend");
            return unsafe { crate::avx2::compute_coefficients_sse41(ctx) };
        }
    }
    debug!("dct: using scalar backend");
    compute_coefficients_impl::<crate::simd::ScalarVector>(ctx)
}

pub(crate) fn compute_coefficients_impl<V: SimdVector>(
    ctx: &mut DctContext<'_>,
) -> TransformResult<()> {
    let mut dct = AlignedBlock::default();
    let mut scratch_space = AlignedBlock::default();
    dct.check_alignment("dct buffer")?;
    scratch_space.check_alignment("scratch buffer")?;

    // validate() guarantees the field is present when AQ is on
    let quant_field = if ctx.use_adaptive_quantization {
        ctx.quant_field
    } else {
        None
    };

    for (comp, buffer) in ctx.components.iter().zip(ctx.coeff_buffers.iter_mut()) {
        let by0 = ctx.next_imcu_row * comp.v_samp_factor;
        let block_rows_left = comp.height_in_blocks - by0;
        let max_block_rows = comp.v_samp_factor.min(block_rows_left);
        // The view is re-acquired on every invocation; the backing array may
        // page rows out between MCU rows.
        let ba = buffer.access(by0, max_block_rows)?;
        let qmc = comp.quant_mul;
        trace!(
            "dct: rows {}..{} of {} blocks/row",
            by0,
            by0 + max_block_rows,
            comp.width_in_blocks
        );
        for iy in 0..comp.v_samp_factor {
            let by = by0 + iy;
            if by >= comp.height_in_blocks {
                continue;
            }
            let brow = &mut ba[iy * comp.width_in_blocks..][..comp.width_in_blocks];
            for (bx, block) in brow.iter_mut().enumerate() {
                let pixels = comp.row_buffer.tile(DCTSIZE * by, DCTSIZE * bx);
                transform_from_pixels::<V>(
                    pixels,
                    comp.row_buffer.stride(),
                    &mut dct.0,
                    &mut scratch_space.0,
                );
                if let Some(field) = &quant_field {
                    // Create more zeros where the quant field reports the
                    // content tolerates a coarser quantizer.
                    let relq = field.row(by * comp.v_factor)[bx * comp.h_factor];
                    let zero_bias = zero_bias_for(comp.zero_bias_mul, relq);
                    quantize_block::<V>(&dct.0, qmc, zero_bias, block);
                } else {
                    quantize_block_no_aq::<V>(&dct.0, qmc, block);
                }
                // Center DC values around zero. Scalar round is
                // ties-away-from-zero here, unlike the vector rounding above.
                block[0] = ((dct.0[0] - K_DC_BIAS) * qmc[0]).round() as i16;
            }
        }
    }
    Ok(())
}
