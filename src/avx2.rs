#![cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))]

//! SSE4.1 and AVX2 backends, selected at runtime by the coefficient driver.
//!
//! Both implement [`SimdVector`] with unaligned loads, so only the scratch
//! blocks owned by the driver need the 32-byte alignment. The transposes
//! are the interleave/concat shuffle sequences of the 128- and 256-bit
//! lane widths; everything else falls out of the generic kernels.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use crate::coefficients::{compute_coefficients_impl, DctContext};
use crate::error::TransformResult;
use crate::simd::SimdVector;
use crate::DCTSIZE2;

const ROUND_NEAREST: i32 = _MM_FROUND_TO_NEAREST_INT | _MM_FROUND_NO_EXC;

/// Eight f32 lanes (AVX2 + FMA)
#[derive(Clone, Copy)]
pub(crate) struct F32x8(__m256);

impl SimdVector for F32x8 {
    const LANES: usize = 8;

    #[inline(always)]
    fn splat(v: f32) -> Self {
        F32x8(unsafe { _mm256_set1_ps(v) })
    }

    #[inline(always)]
    fn load(src: &[f32]) -> Self {
        debug_assert!(src.len() >= Self::LANES);
        F32x8(unsafe { _mm256_loadu_ps(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [f32]) {
        debug_assert!(dst.len() >= Self::LANES);
        unsafe { _mm256_storeu_ps(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        F32x8(unsafe { _mm256_add_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        F32x8(unsafe { _mm256_sub_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        F32x8(unsafe { _mm256_mul_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn mul_add(self, mul: Self, add: Self) -> Self {
        F32x8(unsafe { _mm256_fmadd_ps(self.0, mul.0, add.0) })
    }

    #[inline(always)]
    fn abs(self) -> Self {
        F32x8(unsafe { _mm256_andnot_ps(_mm256_set1_ps(-0.0), self.0) })
    }

    #[inline(always)]
    fn round(self) -> Self {
        F32x8(unsafe { _mm256_round_ps::<ROUND_NEAREST>(self.0) })
    }

    #[inline(always)]
    fn ge(self, rhs: Self) -> Self {
        F32x8(unsafe { _mm256_cmp_ps::<_CMP_GE_OQ>(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        F32x8(unsafe { _mm256_and_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn store_i16(self, dst: &mut [i16]) {
        debug_assert!(dst.len() >= Self::LANES);
        unsafe {
            let ints = _mm256_cvtps_epi32(self.0);
            // packs operates per 128-bit lane, so the narrowed halves land
            // in the low quadword of each lane
            let packed = _mm256_packs_epi32(ints, ints);
            let lo = _mm256_castsi256_si128(packed);
            let hi = _mm256_extracti128_si256::<1>(packed);
            let row = _mm_unpacklo_epi64(lo, hi);
            _mm_storeu_si128(dst.as_mut_ptr() as *mut __m128i, row);
        }
    }

    fn transpose8x8(from: &[f32; DCTSIZE2], to: &mut [f32; DCTSIZE2]) {
        unsafe {
            let i0 = _mm256_loadu_ps(from.as_ptr());
            let i1 = _mm256_loadu_ps(from.as_ptr().add(8));
            let i2 = _mm256_loadu_ps(from.as_ptr().add(16));
            let i3 = _mm256_loadu_ps(from.as_ptr().add(24));
            let i4 = _mm256_loadu_ps(from.as_ptr().add(32));
            let i5 = _mm256_loadu_ps(from.as_ptr().add(40));
            let i6 = _mm256_loadu_ps(from.as_ptr().add(48));
            let i7 = _mm256_loadu_ps(from.as_ptr().add(56));

            let q0 = _mm256_unpacklo_ps(i0, i2);
            let q1 = _mm256_unpacklo_ps(i1, i3);
            let q2 = _mm256_unpackhi_ps(i0, i2);
            let q3 = _mm256_unpackhi_ps(i1, i3);
            let q4 = _mm256_unpacklo_ps(i4, i6);
            let q5 = _mm256_unpacklo_ps(i5, i7);
            let q6 = _mm256_unpackhi_ps(i4, i6);
            let q7 = _mm256_unpackhi_ps(i5, i7);

            let r0 = _mm256_unpacklo_ps(q0, q1);
            let r1 = _mm256_unpackhi_ps(q0, q1);
            let r2 = _mm256_unpacklo_ps(q2, q3);
            let r3 = _mm256_unpackhi_ps(q2, q3);
            let r4 = _mm256_unpacklo_ps(q4, q5);
            let r5 = _mm256_unpackhi_ps(q4, q5);
            let r6 = _mm256_unpacklo_ps(q6, q7);
            let r7 = _mm256_unpackhi_ps(q6, q7);

            _mm256_storeu_ps(to.as_mut_ptr(), _mm256_permute2f128_ps::<0x20>(r0, r4));
            _mm256_storeu_ps(to.as_mut_ptr().add(8), _mm256_permute2f128_ps::<0x20>(r1, r5));
            _mm256_storeu_ps(to.as_mut_ptr().add(16), _mm256_permute2f128_ps::<0x20>(r2, r6));
            _mm256_storeu_ps(to.as_mut_ptr().add(24), _mm256_permute2f128_ps::<0x20>(r3, r7));
            _mm256_storeu_ps(to.as_mut_ptr().add(32), _mm256_permute2f128_ps::<0x31>(r0, r4));
            _mm256_storeu_ps(to.as_mut_ptr().add(40), _mm256_permute2f128_ps::<0x31>(r1, r5));
            _mm256_storeu_ps(to.as_mut_ptr().add(48), _mm256_permute2f128_ps::<0x31>(r2, r6));
            _mm256_storeu_ps(to.as_mut_ptr().add(56), _mm256_permute2f128_ps::<0x31>(r3, r7));
        }
    }
}

/// Four f32 lanes (SSE4.1)
#[derive(Clone, Copy)]
pub(crate) struct F32x4(__m128);

impl SimdVector for F32x4 {
    const LANES: usize = 4;

    #[inline(always)]
    fn splat(v: f32) -> Self {
        F32x4(unsafe { _mm_set1_ps(v) })
    }

    #[inline(always)]
    fn load(src: &[f32]) -> Self {
        debug_assert!(src.len() >= Self::LANES);
        F32x4(unsafe { _mm_loadu_ps(src.as_ptr()) })
    }

    #[inline(always)]
    fn store(self, dst: &mut [f32]) {
        debug_assert!(dst.len() >= Self::LANES);
        unsafe { _mm_storeu_ps(dst.as_mut_ptr(), self.0) }
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        F32x4(unsafe { _mm_add_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        F32x4(unsafe { _mm_sub_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        F32x4(unsafe { _mm_mul_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn mul_add(self, mul: Self, add: Self) -> Self {
        F32x4(unsafe { _mm_add_ps(_mm_mul_ps(self.0, mul.0), add.0) })
    }

    #[inline(always)]
    fn abs(self) -> Self {
        F32x4(unsafe { _mm_andnot_ps(_mm_set1_ps(-0.0), self.0) })
    }

    #[inline(always)]
    fn round(self) -> Self {
        F32x4(unsafe { _mm_round_ps::<ROUND_NEAREST>(self.0) })
    }

    #[inline(always)]
    fn ge(self, rhs: Self) -> Self {
        F32x4(unsafe { _mm_cmpge_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn and(self, rhs: Self) -> Self {
        F32x4(unsafe { _mm_and_ps(self.0, rhs.0) })
    }

    #[inline(always)]
    fn store_i16(self, dst: &mut [i16]) {
        debug_assert!(dst.len() >= Self::LANES);
        unsafe {
            let ints = _mm_cvtps_epi32(self.0);
            let packed = _mm_packs_epi32(ints, ints);
            _mm_storel_epi64(dst.as_mut_ptr() as *mut __m128i, packed);
        }
    }

    fn transpose8x8(from: &[f32; DCTSIZE2], to: &mut [f32; DCTSIZE2]) {
        // 4x4 tiles, transposed in registers and swapped across the diagonal
        unsafe {
            for n in (0..8).step_by(4) {
                for m in (0..8).step_by(4) {
                    let p0 = _mm_loadu_ps(from.as_ptr().add(n * 8 + m));
                    let p1 = _mm_loadu_ps(from.as_ptr().add((n + 1) * 8 + m));
                    let p2 = _mm_loadu_ps(from.as_ptr().add((n + 2) * 8 + m));
                    let p3 = _mm_loadu_ps(from.as_ptr().add((n + 3) * 8 + m));

                    let q0 = _mm_unpacklo_ps(p0, p2);
                    let q1 = _mm_unpacklo_ps(p1, p3);
                    let q2 = _mm_unpackhi_ps(p0, p2);
                    let q3 = _mm_unpackhi_ps(p1, p3);

                    let r0 = _mm_unpacklo_ps(q0, q1);
                    let r1 = _mm_unpackhi_ps(q0, q1);
                    let r2 = _mm_unpacklo_ps(q2, q3);
                    let r3 = _mm_unpackhi_ps(q2, q3);

                    _mm_storeu_ps(to.as_mut_ptr().add(m * 8 + n), r0);
                    _mm_storeu_ps(to.as_mut_ptr().add((m + 1) * 8 + n), r1);
                    _mm_storeu_ps(to.as_mut_ptr().add((m + 2) * 8 + n), r2);
                    _mm_storeu_ps(to.as_mut_ptr().add((m + 3) * 8 + n), r3);
                }
            }
        }
    }
}

/// # Safety
/// The caller must have verified `avx2` and `fma` support.
#[target_feature(enable = "avx2", enable = "fma")]
pub(crate) unsafe fn compute_coefficients_avx2(ctx: &mut DctContext<'_>) -> TransformResult<()> {
    compute_coefficients_impl::<F32x8>(ctx)
}

/// # Safety
/// The caller must have verified `sse4.1` support.
#[target_feature(enable = "sse4.1")]
pub(crate) unsafe fn compute_coefficients_sse41(ctx: &mut DctContext<'_>) -> TransformResult<()> {
    compute_coefficients_impl::<F32x4>(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dct::transform_from_pixels;
    use crate::quantize::quantize_block;
    use crate::simd::ScalarVector;

    fn test_block() -> [f32; 64] {
        let mut block = [0.0f32; 64];
        let mut state = 0xb5ad4eceu32;
        for v in block.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *v = (state >> 8) as f32 / (1 << 16) as f32 - 128.0;
        }
        block
    }

    #[target_feature(enable = "avx2", enable = "fma")]
    unsafe fn dct_avx2(pixels: &[f32; 64], out: &mut [f32; 64]) {
        let mut scratch = [0.0f32; 64];
        transform_from_pixels::<F32x8>(pixels, 8, out, &mut scratch);
    }

    #[target_feature(enable = "sse4.1")]
    unsafe fn dct_sse41(pixels: &[f32; 64], out: &mut [f32; 64]) {
        let mut scratch = [0.0f32; 64];
        transform_from_pixels::<F32x4>(pixels, 8, out, &mut scratch);
    }

    #[test]
    fn wide_backends_match_scalar_dct() {
        let pixels = test_block();
        let mut scalar = [0.0f32; 64];
        let mut scratch = [0.0f32; 64];
        transform_from_pixels::<ScalarVector>(&pixels, 8, &mut scalar, &mut scratch);

        if is_x86_feature_detected!("sse4.1") {
            let mut wide = [0.0f32; 64];
            unsafe { dct_sse41(&pixels, &mut wide) };
            for k in 0..64 {
                assert!((wide[k] - scalar[k]).abs() < 1e-3, "sse4.1 lane {}", k);
            }
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            let mut wide = [0.0f32; 64];
            unsafe { dct_avx2(&pixels, &mut wide) };
            for k in 0..64 {
                assert!((wide[k] - scalar[k]).abs() < 1e-3, "avx2 lane {}", k);
            }
        }
    }

    #[target_feature(enable = "avx2", enable = "fma")]
    unsafe fn quantize_avx2(dct: &[f32; 64], qmc: &[f32; 64], zb: f32, out: &mut [i16; 64]) {
        quantize_block::<F32x8>(dct, qmc, zb, out);
    }

    #[test]
    fn avx2_quantizer_matches_scalar() {
        if !(is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")) {
            return;
        }
        let dct = test_block();
        let mut qmc = [0.0f32; 64];
        for (k, q) in qmc.iter_mut().enumerate() {
            *q = 1.0 / (1.0 + k as f32);
        }
        let mut scalar = [0i16; 64];
        quantize_block::<ScalarVector>(&dct, &qmc, 0.75, &mut scalar);
        let mut wide = [0i16; 64];
        unsafe { quantize_avx2(&dct, &qmc, 0.75, &mut wide) };
        assert_eq!(scalar, wide);
    }

    #[test]
    fn simd_transposes_match_scalar() {
        let tile = test_block();
        let mut want = [0.0f32; 64];
        ScalarVector::transpose8x8(&tile, &mut want);

        if is_x86_feature_detected!("sse4.1") {
            let mut got = [0.0f32; 64];
            F32x4::transpose8x8(&tile, &mut got);
            assert_eq!(got, want);
        }
        if is_x86_feature_detected!("avx2") {
            let mut got = [0.0f32; 64];
            F32x8::transpose8x8(&tile, &mut got);
            assert_eq!(got, want);
        }
    }
}
