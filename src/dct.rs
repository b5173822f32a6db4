//! Forward 8x8 DCT-II, factored as two vectorized 1-D passes.
//!
//! The 1-D kernel uses the recursive even/odd factorization: fold the input
//! into `x[i] + x[N-1-i]` (even half) and `x[i] - x[N-1-i]` (odd half),
//! recurse on both, scale the odd half by `1 / (2 cos((i + 0.5) pi / N))`
//! before its recursion and run the `B` post-pass after it, then interleave.
//! Each call processes eight length-8 columns at once, `V::LANES` columns
//! per vector, with rows 8 floats apart in the working tile.
//!
//! No normalization happens inside the kernel; each 1-D pass scales its
//! output by 1/8 in the store, so the full 2-D transform carries the 1/64
//! separable factor that puts the DC coefficient at the pixel mean.

use crate::plane::AlignedBlock;
use crate::simd::SimdVector;
use crate::DCTSIZE2;

// 1 / (2 * cos((i + 0.5) * pi / N)) for i in 0..N/2
const WC_MULTIPLIERS_8: [f32; 4] = [
    0.5097955791041592,
    0.6013448869350453,
    0.8999762231364156,
    2.5629154477415055,
];
const WC_MULTIPLIERS_4: [f32; 2] = [0.541196100146197, 1.3065629648763764];

const SQRT2: f32 = 1.41421356237;

#[inline(always)]
fn add_reverse<V: SimdVector, const N: usize>(ain1: &[f32], ain2: &[f32], aout: &mut [f32]) {
    for i in 0..N {
        let in1 = V::load(&ain1[i * 8..]);
        let in2 = V::load(&ain2[(N - 1 - i) * 8..]);
        in1.add(in2).store(&mut aout[i * 8..]);
    }
}

#[inline(always)]
fn sub_reverse<V: SimdVector, const N: usize>(ain1: &[f32], ain2: &[f32], aout: &mut [f32]) {
    for i in 0..N {
        let in1 = V::load(&ain1[i * 8..]);
        let in2 = V::load(&ain2[(N - 1 - i) * 8..]);
        in1.sub(in2).store(&mut aout[i * 8..]);
    }
}

#[inline(always)]
fn multiply_wc<V: SimdVector, const HALF: usize>(coeff: &mut [f32], multipliers: &[f32; HALF]) {
    for i in 0..HALF {
        let mul = V::splat(multipliers[i]);
        V::load(&coeff[i * 8..]).mul(mul).store(&mut coeff[i * 8..]);
    }
}

/// Post-pass over the odd-indexed coefficients:
/// `c[0] = sqrt(2)*c[0] + c[1]`, `c[i] += c[i+1]` for interior i,
/// last row unchanged.
#[inline(always)]
fn b_transform<V: SimdVector, const HALF: usize>(coeff: &mut [f32]) {
    let sqrt2 = V::splat(SQRT2);
    let in1 = V::load(coeff);
    let in2 = V::load(&coeff[8..]);
    in1.mul_add(sqrt2, in2).store(coeff);
    for i in 1..HALF - 1 {
        let in1 = V::load(&coeff[i * 8..]);
        let in2 = V::load(&coeff[(i + 1) * 8..]);
        in1.add(in2).store(&mut coeff[i * 8..]);
    }
}

/// Interleaves the recursion output back to natural coefficient order:
/// rows 0..N/2 go to even output rows, rows N/2..N to odd output rows.
#[inline(always)]
fn interleave_even_odd<V: SimdVector, const N: usize>(ain: &[f32], aout: &mut [f32]) {
    for i in 0..N / 2 {
        V::load(&ain[i * 8..]).store(&mut aout[2 * i * 8..]);
    }
    for i in N / 2..N {
        V::load(&ain[i * 8..]).store(&mut aout[(2 * (i - N / 2) + 1) * 8..]);
    }
}

#[inline(always)]
fn dct1d_vec2<V: SimdVector>(mem: &mut [f32]) {
    let in1 = V::load(mem);
    let in2 = V::load(&mem[8..]);
    in1.add(in2).store(mem);
    in1.sub(in2).store(&mut mem[8..]);
}

#[inline(always)]
fn dct1d_vec4<V: SimdVector>(mem: &mut [f32]) {
    let mut tmp = [0.0f32; 32];
    {
        let (even, odd) = tmp.split_at_mut(16);
        let (lo, hi) = mem.split_at(16);
        add_reverse::<V, 2>(lo, hi, even);
        dct1d_vec2::<V>(even);
        sub_reverse::<V, 2>(lo, hi, odd);
        multiply_wc::<V, 2>(odd, &WC_MULTIPLIERS_4);
        dct1d_vec2::<V>(odd);
        b_transform::<V, 2>(odd);
    }
    interleave_even_odd::<V, 4>(&tmp, mem);
}

#[inline(always)]
fn dct1d_vec8<V: SimdVector>(mem: &mut [f32]) {
    let mut tmp = [0.0f32; DCTSIZE2];
    {
        let (even, odd) = tmp.split_at_mut(32);
        let (lo, hi) = mem.split_at(32);
        add_reverse::<V, 4>(lo, hi, even);
        dct1d_vec4::<V>(even);
        sub_reverse::<V, 4>(lo, hi, odd);
        multiply_wc::<V, 4>(odd, &WC_MULTIPLIERS_8);
        dct1d_vec4::<V>(odd);
        b_transform::<V, 4>(odd);
    }
    interleave_even_odd::<V, 8>(&tmp, mem);
}

/// Loads a strip of `V::LANES` columns at column offset `off` from a strided
/// pixel buffer into the working tile (row stride 8).
#[inline(always)]
fn load_from_block<V: SimdVector>(
    pixels: &[f32],
    pixels_stride: usize,
    off: usize,
    coeff: &mut [f32; DCTSIZE2],
) {
    for i in 0..8 {
        V::load(&pixels[i * pixels_stride + off..]).store(&mut coeff[i * 8..]);
    }
}

/// Stores a strip back to the output tile, applying the per-pass 1/8 scale.
#[inline(always)]
fn store_to_block_and_scale<V: SimdVector>(
    coeff: &[f32; DCTSIZE2],
    output: &mut [f32; DCTSIZE2],
    off: usize,
) {
    let mul = V::splat(1.0 / 8.0);
    for i in 0..8 {
        V::load(&coeff[i * 8..])
            .mul(mul)
            .store(&mut output[i * 8 + off..]);
    }
}

/// One vertical 1-D DCT pass over an 8-row strided input, written to a
/// row-major 8x8 output tile.
#[inline(always)]
fn dct1d<V: SimdVector>(pixels: &[f32], pixels_stride: usize, output: &mut [f32; DCTSIZE2]) {
    let mut tmp = AlignedBlock::default();
    let mut off = 0;
    while off < 8 {
        load_from_block::<V>(pixels, pixels_stride, off, &mut tmp.0);
        dct1d_vec8::<V>(&mut tmp.0);
        store_to_block_and_scale::<V>(&tmp.0, output, off);
        off += V::LANES;
    }
}

/// Full 2-D forward transform of one 8x8 block.
///
/// `pixels` is a strided view whose first 8 samples of each of 8 rows form
/// the block; `coefficients` receives the scaled output in natural order.
/// `coefficients` and `scratch_space` swap roles between the passes but are
/// always distinct buffers.
pub(crate) fn transform_from_pixels<V: SimdVector>(
    pixels: &[f32],
    pixels_stride: usize,
    coefficients: &mut [f32; DCTSIZE2],
    scratch_space: &mut [f32; DCTSIZE2],
) {
    dct1d::<V>(pixels, pixels_stride, scratch_space);
    V::transpose8x8(scratch_space, coefficients);
    dct1d::<V>(&coefficients[..], 8, scratch_space);
    V::transpose8x8(scratch_space, coefficients);
}

/// Forward DCT of one level-shifted 8x8 block using the scalar backend.
///
/// * `pixels`: input block, 64 elements row-major, centered around 0.0
/// * `coefficients`: output DCT coefficients, natural order
/// * `scratch_space`: 64-element temporary
pub fn forward_dct_float(
    pixels: &[f32; DCTSIZE2],
    coefficients: &mut [f32; DCTSIZE2],
    scratch_space: &mut [f32; DCTSIZE2],
) {
    transform_from_pixels::<crate::simd::ScalarVector>(pixels, 8, coefficients, scratch_space);
}
