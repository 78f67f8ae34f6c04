//! Gaussian smoothing (C1), two-pass separable.
//!
//! A 1-D kernel of length `2R + 1` (`R = factor - 1`) built from `N(0, σ)`
//! with `σ = (factor - 1) / 2` is applied vertically then horizontally.
//! Both passes zero out NaN/Inf source samples (in both the weight and
//! value accumulators) and renormalize by the surviving weight sum, so a
//! pixel near a NaN region is smoothed only over its finite neighbors
//! rather than being polluted by them. After both passes, any output pixel
//! whose source center was itself NaN is forced back to NaN — smoothing
//! never invents data under a masked-out pixel.

use crate::error::{Error, Result};

/// Builds the normalized 1-D Gaussian kernel used by both passes.
fn build_kernel(factor: i64) -> Vec<f64> {
    let radius = (factor - 1).max(0);
    let sigma = (factor - 1) as f64 / 2.0;
    let sigma = if sigma <= 0.0 { 1e-6 } else { sigma };
    let len = (2 * radius + 1) as usize;
    let mut kernel = vec![0.0f64; len];
    let mut total = 0.0f64;
    for (i, w) in kernel.iter_mut().enumerate() {
        let x = i as f64 - radius as f64;
        *w = (-(x * x) / (2.0 * sigma * sigma)).exp();
        total += *w;
    }
    if total > 0.0 {
        for w in kernel.iter_mut() {
            *w /= total;
        }
    }
    kernel
}

#[inline]
fn is_finite(v: f32) -> bool {
    v == v && v.abs() != f32::INFINITY
}

/// Smooths `src` (`width x height`, row-major) with a Gaussian of the
/// given downsample `factor`, returning a buffer of the same dimensions.
pub fn gaussian_smooth(src: &[f32], width: i64, height: i64, factor: i64) -> Result<Vec<f32>> {
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

    let kernel = build_kernel(factor);
    let radius = (kernel.len() / 2) as i64;

    let vertical = pass_vertical(src, width, height, &kernel, radius);
    let horizontal = pass_horizontal(&vertical, width, height, &kernel, radius);

    let mut out = horizontal;
    for (i, v) in src.iter().enumerate() {
        if !is_finite(*v) {
            out[i] = f32::NAN;
        }
    }
    Ok(out)
}

fn pass_vertical(src: &[f32], width: i64, height: i64, kernel: &[f64], radius: i64) -> Vec<f32> {
    let mut out = vec![0.0f32; src.len()];
    for x in 0..width {
        for y in 0..height {
            let mut wsum = 0.0f64;
            let mut vsum = 0.0f64;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = y + k as i64 - radius;
                if sy < 0 || sy >= height {
                    continue;
                }
                let v = src[(sy * width + x) as usize];
                if is_finite(v) {
                    wsum += w;
                    vsum += w * v as f64;
                }
            }
            out[(y * width + x) as usize] = if wsum > 0.0 { (vsum / wsum) as f32 } else { f32::NAN };
        }
    }
    out
}

fn pass_horizontal(src: &[f32], width: i64, height: i64, kernel: &[f64], radius: i64) -> Vec<f32> {
    let mut out = vec![0.0f32; src.len()];
    for y in 0..height {
        let row_start = (y * width) as usize;
        let row = &src[row_start..row_start + width as usize];
        for x in 0..width {
            let mut wsum = 0.0f64;
            let mut vsum = 0.0f64;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = x + k as i64 - radius;
                if sx < 0 || sx >= width {
                    continue;
                }
                let v = row[sx as usize];
                if is_finite(v) {
                    wsum += w;
                    vsum += w * v as f64;
                }
            }
            out[row_start + x as usize] = if wsum > 0.0 { (vsum / wsum) as f32 } else { f32::NAN };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constant_plane_stays_constant() {
        let src = vec![5.0f32; 9 * 9];
        let out = gaussian_smooth(&src, 9, 9, 3).unwrap();
        for v in out {
            assert_abs_diff_eq!(v, 5.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn nan_source_pixel_stays_nan() {
        let mut src = vec![1.0f32; 5 * 5];
        src[12] = f32::NAN; // center
        let out = gaussian_smooth(&src, 5, 5, 2).unwrap();
        assert!(out[12].is_nan());
    }

    #[test]
    fn neighbor_of_nan_is_smoothed_over_finite_values_only() {
        let mut src = vec![2.0f32; 5 * 5];
        src[12] = f32::NAN;
        let out = gaussian_smooth(&src, 5, 5, 2).unwrap();
        assert_abs_diff_eq!(out[7], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn rejects_nonpositive_factor() {
        let src = vec![1.0f32; 4];
        assert!(gaussian_smooth(&src, 2, 2, 0).is_err());
    }
}
