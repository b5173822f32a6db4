//! # Forward DCT and quantization stage for JPEG encoding
//!
//! This crate implements the block transform stage of a baseline JPEG
//! encoder: it takes planar, level-shifted, pre-padded f32 samples and
//! produces quantized 16-bit DCT coefficient blocks in natural order, ready
//! for entropy coding. Color conversion, chroma subsampling, quantization
//! table derivation, entropy coding and marker emission are collaborators
//! outside this crate.
//!
//! The transform is a numerically exact factored float DCT-II (two 1-D
//! passes with a transpose between them), followed by quantization with an
//! optional adaptive zero-bias driven by an externally supplied
//! quantization field, and a DC centering step that recomputes the DC
//! coefficient from the unquantized transform output.
//!
//! # Example
//!
//! ```
//! use jpeg_fdct::{
//!     compute_dct_coefficients, ComponentDescriptor, DctContext, PlaneView, VirtualBlockArray,
//! };
//!
//! // One 8x8 component, identity quantization
//! let samples = vec![128.0f32; 64];
//! let quant_mul = [1.0f32; 64];
//! let components = [ComponentDescriptor {
//!     width_in_blocks: 1,
//!     height_in_blocks: 1,
//!     h_samp_factor: 1,
//!     v_samp_factor: 1,
//!     h_factor: 1,
//!     v_factor: 1,
//!     quant_mul: &quant_mul,
//!     zero_bias_mul: 0.0,
//!     row_buffer: PlaneView::new(&samples, 8),
//! }];
//! let mut coeffs = [VirtualBlockArray::new(1, 1)];
//! let mut ctx = DctContext {
//!     components: &components,
//!     coeff_buffers: &mut coeffs,
//!     next_imcu_row: 0,
//!     use_adaptive_quantization: false,
//!     quant_field: None,
//! };
//! compute_dct_coefficients(&mut ctx).unwrap();
//! // Mid-gray block: DC centers to zero, no AC energy
//! assert_eq!(coeffs[0].block(0, 0), &[0i16; 64]);
//! ```
//!
//! # Crate features
//!
//! * `simd` - Enables runtime-dispatched SSE4.1/AVX2 kernels on x86/x86_64.
//!   The scalar kernels remain the fallback and the correctness reference.

mod avx2;
mod coefficients;
mod dct;
mod error;
mod plane;
mod quantize;
mod simd;

/// Width and height of a DCT block
pub const DCTSIZE: usize = 8;
/// Number of samples in a DCT block
pub const DCTSIZE2: usize = 64;

pub use coefficients::{compute_dct_coefficients, ComponentDescriptor, DctContext};
pub use dct::forward_dct_float;
pub use error::{TransformError, TransformResult};
pub use plane::{AlignedBlock, CoeffBlock, PlaneView, VirtualBlockArray, BLOCK_ALIGN};
