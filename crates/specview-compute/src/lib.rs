//! # specview-compute
//!
//! Numeric kernels for the specview backend: block-mean downsampling,
//! separable Gaussian smoothing, fixed-precision tile compression, NaN
//! masking, contour tracing, and the histogram/stats accumulators used by
//! the frame and region layers.
//!
//! Every kernel here is pure (no I/O, no session state) and takes plain
//! slices plus `specview-core` value types, so it can be exercised and
//! benchmarked without a loaded image.

pub mod compression;
pub mod contour;
pub mod downsample;
pub mod error;
pub mod nan_encoding;
pub mod smooth;
pub mod stats;
pub mod vertex;

pub use compression::{compress_tile, decompress_tile, CompressedTile, HIGH_COMPRESSION_QUALITY};
pub use contour::{trace_level, trace_levels, Contour};
pub use downsample::downsample;
pub use error::{Error, Result};
pub use nan_encoding::{decode_block_aware, decode_rle, encode_block_aware, encode_rle, BlockNanMask, RunLengthNanMask};
pub use smooth::gaussian_smooth;
pub use stats::{compute_basic_stats, compute_histogram, merge_basic_stats};
pub use vertex::{quantize_and_delta, shuffle_bytes, undelta, unshuffle_bytes};
