//! Coefficient quantization: multiply by the reciprocal quantization table,
//! round, and optionally zero-bias small values.
//!
//! Rounding is intentionally asymmetric: AC coefficients use the backend's
//! vector rounding (round-to-nearest-even), while the DC overwrite in the
//! driver uses scalar `f32::round` (ties away from zero). The asymmetry is
//! load-bearing for bit-exact output and must not be "fixed".

use crate::plane::CoeffBlock;
use crate::simd::SimdVector;
use crate::DCTSIZE2;

/// Unshifted mid-gray of the 8-bit input domain, subtracted from the scaled
/// DC coefficient to center DC values around zero.
pub(crate) const K_DC_BIAS: f32 = 128.0;

/// Per-block zero-bias threshold: `min(1.5, 0.5 + zero_bias_mul * relq)`,
/// where `relq` is the quantization-field value for the block.
#[inline]
pub(crate) fn zero_bias_for(zero_bias_mul: f32, relq: f32) -> f32 {
    (0.5 + zero_bias_mul * relq).min(1.5)
}

/// Quantizes one block with zero-biasing: coefficients whose quantized
/// magnitude falls below `zero_bias` are forced to zero.
pub(crate) fn quantize_block<V: SimdVector>(
    dct: &[f32; DCTSIZE2],
    qmc: &[f32; DCTSIZE2],
    zero_bias: f32,
    block: &mut CoeffBlock,
) {
    let threshold = V::splat(zero_bias);
    let mut k = 0;
    while k < DCTSIZE2 {
        let val = V::load(&dct[k..]);
        let q = V::load(&qmc[k..]);
        let qval = val.mul(q);
        let nzero_mask = qval.abs().ge(threshold);
        qval.round().and(nzero_mask).store_i16(&mut block[k..]);
        k += V::LANES;
    }
}

/// Quantizes one block without the adaptive zero-bias threshold.
pub(crate) fn quantize_block_no_aq<V: SimdVector>(
    dct: &[f32; DCTSIZE2],
    qmc: &[f32; DCTSIZE2],
    block: &mut CoeffBlock,
) {
    let mut k = 0;
    while k < DCTSIZE2 {
        let val = V::load(&dct[k..]);
        let q = V::load(&qmc[k..]);
        val.mul(q).round().store_i16(&mut block[k..]);
        k += V::LANES;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::ScalarVector;

    fn quantize(dct: &[f32; 64], zero_bias: Option<f32>) -> [i16; 64] {
        let qmc = [1.0f32; 64];
        let mut block = [0i16; 64];
        match zero_bias {
            Some(zb) => quantize_block::<ScalarVector>(dct, &qmc, zb, &mut block),
            None => quantize_block_no_aq::<ScalarVector>(dct, &qmc, &mut block),
        }
        block
    }

    #[test]
    fn ac_rounding_is_ties_even() {
        let mut dct = [0.0f32; 64];
        dct[1] = 2.5;
        dct[2] = 3.5;
        dct[3] = -2.5;
        dct[4] = 0.49999;
        let block = quantize(&dct, None);
        assert_eq!(block[1], 2);
        assert_eq!(block[2], 4);
        assert_eq!(block[3], -2);
        assert_eq!(block[4], 0);
    }

    #[test]
    fn zero_bias_clamps_small_values() {
        let mut dct = [0.0f32; 64];
        dct[1] = 0.4;
        dct[2] = 1.2;
        dct[3] = -0.6;
        dct[4] = -1.6;
        let block = quantize(&dct, Some(1.5));
        assert_eq!(block[1], 0);
        assert_eq!(block[2], 0);
        assert_eq!(block[3], 0);
        assert_eq!(block[4], -2);

        let block = quantize(&dct, Some(0.5));
        assert_eq!(block[1], 0);
        assert_eq!(block[2], 1);
        assert_eq!(block[3], -1);
        assert_eq!(block[4], -2);
    }

    #[test]
    fn zero_bias_is_monotonic() {
        let mut dct = [0.0f32; 64];
        let mut state = 0x2f6e2b1u32;
        for v in dct.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *v = (state >> 16) as f32 / 8192.0 - 4.0;
        }
        let low = quantize(&dct, Some(0.5));
        let high = quantize(&dct, Some(1.5));
        for k in 0..64 {
            if low[k] == 0 {
                assert_eq!(high[k], 0, "zero became nonzero at {}", k);
            } else if high[k] != 0 {
                assert_eq!(high[k].signum(), low[k].signum(), "sign flip at {}", k);
            }
        }
    }

    #[test]
    fn aq_with_zero_threshold_matches_no_aq() {
        let mut dct = [0.0f32; 64];
        for (k, v) in dct.iter_mut().enumerate() {
            *v = (k as f32 - 31.5) * 0.37;
        }
        assert_eq!(quantize(&dct, Some(0.0)), quantize(&dct, None));
    }

    #[test]
    fn saturates_and_clears_nan() {
        let mut dct = [0.0f32; 64];
        dct[1] = 1.0e9;
        dct[2] = -1.0e9;
        dct[3] = f32::NAN;
        let block = quantize(&dct, None);
        assert_eq!(block[1], i16::MAX);
        assert_eq!(block[2], i16::MIN);
        assert_eq!(block[3], 0);
        // NaN fails the >= compare, so the adaptive path zeroes it too
        let block = quantize(&dct, Some(0.5));
        assert_eq!(block[3], 0);
    }

    #[test]
    fn zero_bias_formula() {
        assert_eq!(zero_bias_for(0.0, 0.0), 0.5);
        assert_eq!(zero_bias_for(0.5, 1.0), 1.0);
        assert_eq!(zero_bias_for(2.0, 3.0), 1.5);
    }
}
