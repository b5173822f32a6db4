//! Lane abstraction for the DCT and quantizer kernels.
//!
//! The kernels are generic over [`SimdVector`] and process eight independent
//! length-8 columns in strips of `LANES` columns. `ScalarVector` is always
//! available and is the reference for correctness; wider backends live in
//! the `avx2` module and are selected at runtime.

use crate::DCTSIZE2;

/// A vector of `LANES` f32 values with the operations the transform needs.
///
/// `round` is round-to-nearest-even on every backend (the hardware default
/// for vector rounding). `ge` produces an all-ones/all-zeros lane mask and
/// `and` applies it, which together implement the zero-biasing blend.
pub(crate) trait SimdVector: Copy {
    const LANES: usize;

    fn splat(v: f32) -> Self;
    fn load(src: &[f32]) -> Self;
    fn store(self, dst: &mut [f32]);
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn mul_add(self, mul: Self, add: Self) -> Self;
    fn abs(self) -> Self;
    fn round(self) -> Self;
    /// Lane mask: all bits set where `self >= rhs`, zero elsewhere
    fn ge(self, rhs: Self) -> Self;
    /// Bitwise and, used to zero lanes rejected by the mask
    fn and(self, rhs: Self) -> Self;
    /// Saturating conversion to i16. Values outside the i16 range and NaN
    /// are backend-specific: the scalar cast maps NaN to 0 and saturates
    /// both ways, the x86 narrow collapses NaN and positive overflow to
    /// `i16::MIN`. Quantized coefficients stay in range, so the backends
    /// agree on all driver inputs.
    fn store_i16(self, dst: &mut [i16]);

    /// Transpose an 8x8 tile: `to[8*i + j] = from[8*j + i]`.
    ///
    /// Backends with shuffles override this; the scalar fallback is correct
    /// on every target.
    fn transpose8x8(from: &[f32; DCTSIZE2], to: &mut [f32; DCTSIZE2]) {
        for n in 0..8 {
            for m in 0..8 {
                to[8 * n + m] = from[8 * m + n];
            }
        }
    }
}

/// Single-lane backend, used for correctness testing and as the runtime
/// fallback when no SIMD extension is available.
#[derive(Clone, Copy)]
pub(crate) struct ScalarVector(pub(crate) f32);

impl SimdVector for ScalarVector {
    const LANES: usize = 1;

    #[inline(always)]
    fn splat(v: f32) -> Self {
        ScalarVector(v)
    }

    #[inline(always)]
    fn load(src: &[f32]) -> Self {
        ScalarVector(src[0])
    }

    #[inline(always)]
    fn store(self, dst: &mut [f32]) {
        dst[0] = self.0;
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        ScalarVector(self.0 + rhs.0)
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        ScalarVector(self.0 - rhs.0)
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        ScalarVector(self.0 * rhs.0)
    }

    #[inline(always)]
    fn mul_add(self, mul: Self, add: Self) -> Self {
        // Unfused, to match the mul+add sequence of the 128-bit backend
        ScalarVector(self.0 * mul.0 + add.0)
    }

    #[inline(always)]
    fn abs(self) -> Self {
        ScalarVector(f32::from_bits(self.0.to_bits() & 0x7fff_ffff))
    }

    #[inline(always)]
    fn round(self) -> Self {
        ScalarVector(self.0.round_ties_even())
    }

    #[inline(always)]
    fn ge(self, rhs: Self) -> Self {
        ScalarVector(if self.0 >= rhs.0 {
            f32::from_bits(u32::MAX)
        } else {
            f32::from_bits(0)
        })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        ScalarVector(f32::from_bits(self.0.to_bits() & rhs.0.to_bits()))
    }

    #[inline(always)]
    fn store_i16(self, dst: &mut [i16]) {
        // Float to int casts saturate; NaN becomes 0
        dst[0] = self.0 as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_is_ties_even() {
        assert_eq!(ScalarVector(2.5).round().0, 2.0);
        assert_eq!(ScalarVector(3.5).round().0, 4.0);
        assert_eq!(ScalarVector(-2.5).round().0, -2.0);
        assert_eq!(ScalarVector(-0.5).round().0, -0.0);
    }

    #[test]
    fn scalar_mask_blend() {
        let v = ScalarVector(3.0);
        let kept = v.and(ScalarVector(1.0).ge(ScalarVector(0.5)));
        assert_eq!(kept.0, 3.0);
        let dropped = v.and(ScalarVector(0.25).ge(ScalarVector(0.5)));
        assert_eq!(dropped.0, 0.0);
    }

    #[test]
    fn scalar_store_i16_saturates() {
        let mut out = [0i16; 1];
        ScalarVector(1.0e9).store_i16(&mut out);
        assert_eq!(out[0], i16::MAX);
        ScalarVector(-1.0e9).store_i16(&mut out);
        assert_eq!(out[0], i16::MIN);
        ScalarVector(f32::NAN).store_i16(&mut out);
        assert_eq!(out[0], 0);
    }

    #[test]
    fn default_transpose_mapping() {
        let mut tile = [0.0f32; DCTSIZE2];
        for i in 0..8 {
            for j in 0..8 {
                tile[i * 8 + j] = (i * 10 + j) as f32;
            }
        }
        let mut out = [0.0f32; DCTSIZE2];
        ScalarVector::transpose8x8(&tile, &mut out);
        for i in 0..8 {
            for j in 0..8 {
                assert_eq!(out[i * 8 + j], tile[j * 8 + i]);
            }
        }
        let mut back = [0.0f32; DCTSIZE2];
        ScalarVector::transpose8x8(&out, &mut back);
        assert_eq!(back, tile);
    }
}
