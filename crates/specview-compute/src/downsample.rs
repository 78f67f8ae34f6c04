//! Block-mean downsampling (C1).
//!
//! Three implementations of the same reduction — scalar, an SSE2-width
//! (4-lane) variant, and an AVX-width (8-lane) variant — all built on the
//! `wide` portable-SIMD crate rather than raw intrinsics, so they run on
//! any target `wide` supports instead of only x86_64. [`downsample`]
//! dispatches between them: a factor divisible by 8 takes the wide
//! variant, divisible by 4 takes the narrow variant, otherwise scalar.
//! All three must agree within the error bound checked in this module's
//! tests.

use wide::{f32x4, f32x8};

use crate::error::{Error, Result};

#[inline]
fn is_finite(v: f32) -> bool {
    // NaN: `x != x`. Inf: sign-masked equality against +Inf.
    v == v && v.abs() != f32::INFINITY
}

/// Block-mean downsamples `src` (row-major, `width x height`) by `factor`,
/// with an optional per-axis block offset `(xoff, yoff)` (used when tiling
/// a cube that isn't an exact multiple of `factor * TILE_SIZE`).
///
/// Output dimensions are `ceil((width - xoff) / factor) x ceil((height -
/// yoff) / factor)`. A block with no finite source pixel produces `NaN`.
pub fn downsample(
    src: &[f32],
    width: i64,
    height: i64,
    factor: i64,
    xoff: i64,
    yoff: i64,
) -> Result<Vec<f32>> {
    if factor <= 0 {
        return Err(Error::InvalidFactor { factor });
    }
    let expected = (width.max(0) * height.max(0)) as usize;
    if src.len() != expected {
        return Err(Error::BufferSizeMismatch {
            expected,
            actual: src.len(),
            width,
            height,
        });
    }

    let out_w = ((width - xoff).max(0)).div_ceil(factor).max(0);
    let out_h = ((height - yoff).max(0)).div_ceil(factor).max(0);
    let mut out = vec![f32::NAN; (out_w * out_h) as usize];

    if factor % 8 == 0 {
        downsample_avx(src, width, height, factor, xoff, yoff, out_w, out_h, &mut out);
    } else if factor % 4 == 0 {
        downsample_sse2(src, width, height, factor, xoff, yoff, out_w, out_h, &mut out);
    } else {
        downsample_scalar(src, width, height, factor, xoff, yoff, out_w, out_h, &mut out);
    }
    Ok(out)
}

/// Averages one source row span into a running `(sum, count)` accumulator,
/// scalar reference behavior shared by all three variants at the edges of
/// a block (where the span isn't a full SIMD lane wide).
#[inline]
fn accumulate_scalar_span(row: &[f32], x0: usize, x1: usize, sum: &mut f64, count: &mut i64) {
    for v in &row[x0..x1] {
        if is_finite(*v) {
            *sum += *v as f64;
            *count += 1;
        }
    }
}

fn downsample_scalar(
    src: &[f32],
    width: i64,
    height: i64,
    factor: i64,
    xoff: i64,
    yoff: i64,
    out_w: i64,
    out_h: i64,
    out: &mut [f32],
) {
    for oy in 0..out_h {
        let y0 = (oy * factor + yoff).clamp(0, height);
        let y1 = ((oy + 1) * factor + yoff).clamp(0, height);
        for ox in 0..out_w {
            let x0 = (ox * factor + xoff).clamp(0, width);
            let x1 = ((ox + 1) * factor + xoff).clamp(0, width);
            let mut sum = 0.0f64;
            let mut count = 0i64;
            for y in y0..y1 {
                let row_start = (y * width) as usize;
                let row = &src[row_start..row_start + width as usize];
                accumulate_scalar_span(row, x0 as usize, x1 as usize, &mut sum, &mut count);
            }
            out[(oy * out_w + ox) as usize] = if count > 0 {
                (sum / count as f64) as f32
            } else {
                f32::NAN
            };
        }
    }
}

/// Same reduction as [`downsample_scalar`], summing 4-wide lanes of each
/// source row before falling back to scalar for the remainder.
fn downsample_sse2(
    src: &[f32],
    width: i64,
    height: i64,
    factor: i64,
    xoff: i64,
    yoff: i64,
    out_w: i64,
    out_h: i64,
    out: &mut [f32],
) {
    const LANES: usize = 4;
    for oy in 0..out_h {
        let y0 = (oy * factor + yoff).clamp(0, height);
        let y1 = ((oy + 1) * factor + yoff).clamp(0, height);
        for ox in 0..out_w {
            let x0 = (ox * factor + xoff).clamp(0, width) as usize;
            let x1 = ((ox + 1) * factor + xoff).clamp(0, width) as usize;
            let mut sum = 0.0f64;
            let mut count = 0i64;
            for y in y0..y1 {
                let row_start = (y * width) as usize;
                let row = &src[row_start..row_start + width as usize];
                let span = &row[x0..x1];
                let chunks = span.len() / LANES;
                for c in 0..chunks {
                    let base = c * LANES;
                    let lane = f32x4::new([span[base], span[base + 1], span[base + 2], span[base + 3]]);
                    let is_nan_mask = lane.cmp_ne(lane);
                    let is_inf_mask = lane.abs().cmp_eq(f32x4::splat(f32::INFINITY));
                    let finite_mask = !(is_nan_mask | is_inf_mask);
                    let masked = finite_mask.blend(lane, f32x4::splat(0.0));
                    let lane_sum: f32 = masked.reduce_add();
                    sum += lane_sum as f64;
                    count += finite_mask.to_array().iter().filter(|&&m| m != 0.0).count() as i64;
                }
                accumulate_scalar_span(span, chunks * LANES, span.len(), &mut sum, &mut count);
            }
            out[(oy * out_w + ox) as usize] = if count > 0 {
                (sum / count as f64) as f32
            } else {
                f32::NAN
            };
        }
    }
}

/// Same reduction as [`downsample_scalar`], summing 8-wide lanes.
fn downsample_avx(
    src: &[f32],
    width: i64,
    height: i64,
    factor: i64,
    xoff: i64,
    yoff: i64,
    out_w: i64,
    out_h: i64,
    out: &mut [f32],
) {
    const LANES: usize = 8;
    for oy in 0..out_h {
        let y0 = (oy * factor + yoff).clamp(0, height);
        let y1 = ((oy + 1) * factor + yoff).clamp(0, height);
        for ox in 0..out_w {
            let x0 = (ox * factor + xoff).clamp(0, width) as usize;
            let x1 = ((ox + 1) * factor + xoff).clamp(0, width) as usize;
            let mut sum = 0.0f64;
            let mut count = 0i64;
            for y in y0..y1 {
                let row_start = (y * width) as usize;
                let row = &src[row_start..row_start + width as usize];
                let span = &row[x0..x1];
                let chunks = span.len() / LANES;
                for c in 0..chunks {
                    let base = c * LANES;
                    let mut arr = [0f32; LANES];
                    arr.copy_from_slice(&span[base..base + LANES]);
                    let lane = f32x8::new(arr);
                    let is_nan_mask = lane.cmp_ne(lane);
                    let is_inf_mask = lane.abs().cmp_eq(f32x8::splat(f32::INFINITY));
                    let finite_mask = !(is_nan_mask | is_inf_mask);
                    let masked = finite_mask.blend(lane, f32x8::splat(0.0));
                    let lane_sum: f32 = masked.reduce_add();
                    sum += lane_sum as f64;
                    count += finite_mask.to_array().iter().filter(|&&m| m != 0.0).count() as i64;
                }
                accumulate_scalar_span(span, chunks * LANES, span.len(), &mut sum, &mut count);
            }
            out[(oy * out_w + ox) as usize] = if count > 0 {
                (sum / count as f64) as f32
            } else {
                f32::NAN
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ramp(width: i64, height: i64) -> Vec<f32> {
        (0..width * height).map(|i| i as f32).collect()
    }

    #[test]
    fn scalar_averages_full_block() {
        let src = ramp(4, 4);
        let out = downsample(&src, 4, 4, 2, 0, 0).unwrap();
        // top-left block: 0,1,4,5 -> mean 2.5
        assert_abs_diff_eq!(out[0], 2.5, epsilon = 1e-6);
    }

    #[test]
    fn block_of_all_nan_produces_nan() {
        let src = vec![f32::NAN; 16];
        let out = downsample(&src, 4, 4, 2, 0, 0).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn mixed_nan_block_averages_finite_only() {
        let mut src = ramp(4, 4);
        src[0] = f32::NAN;
        let out = downsample(&src, 4, 4, 2, 0, 0).unwrap();
        // block {NaN,1,4,5} -> mean (1+4+5)/3
        assert_abs_diff_eq!(out[0], 10.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn scalar_sse_avx_agree_within_error_bound() {
        let (w, h) = (64, 64);
        let src = ramp(w, h);
        for factor in [4, 8] {
            let out = downsample(&src, w, h, factor, 0, 0).unwrap();
            let mut out_scalar = vec![f32::NAN; out.len()];
            let out_w = w.div_ceil(factor);
            let out_h = h.div_ceil(factor);
            downsample_scalar(&src, w, h, factor, 0, 0, out_w, out_h, &mut out_scalar);
            let mut total_abs = 0.0f64;
            for (a, b) in out.iter().zip(out_scalar.iter()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
                total_abs += (*a as f64 - *b as f64).abs();
            }
            assert!(total_abs <= 1e-1);
        }
    }

    #[test]
    fn rejects_nonpositive_factor() {
        let src = ramp(4, 4);
        assert!(downsample(&src, 4, 4, 0, 0, 0).is_err());
    }
}
