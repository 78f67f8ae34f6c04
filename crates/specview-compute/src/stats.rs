//! Histogram and BasicStats accumulation (C2), built in parallel with
//! rayon and merged with the join operators each value type already
//! defines (`Histogram::add`, [`merge_basic_stats`]).

use rayon::prelude::*;
use specview_core::{BasicStats, Histogram};

const PAR_CHUNK: usize = 1 << 16;

#[inline]
fn is_finite(v: f32) -> bool {
    v == v && v.abs() != f32::INFINITY
}

/// Accumulates `BasicStats` over `data`, skipping NaN/Inf pixels, using a
/// chunked parallel fold/reduce so the merge step (`num_pixels`, `sum`,
/// `sum_sq`, `min`, `max`) stays associative regardless of chunk size.
pub fn compute_basic_stats(data: &[f32]) -> BasicStats {
    let partial = data
        .par_chunks(PAR_CHUNK)
        .map(accumulate_chunk)
        .reduce(BasicStats::empty, |a, b| merge_basic_stats(&a, &b));
    finalize(partial)
}

fn accumulate_chunk(chunk: &[f32]) -> BasicStats {
    let mut s = BasicStats::empty();
    s.num_pixels = 0;
    s.sum = 0.0;
    s.sum_sq = 0.0;
    s.min = f64::INFINITY;
    s.max = f64::NEG_INFINITY;
    for &v in chunk {
        if !is_finite(v) {
            continue;
        }
        let v = v as f64;
        s.num_pixels += 1;
        s.sum += v;
        s.sum_sq += v * v;
        s.min = s.min.min(v);
        s.max = s.max.max(v);
    }
    s
}

/// Combines two partial accumulations. Associative and commutative, so it
/// is a valid rayon reduce operator and a valid requirements-cache
/// per-region merge operator alike.
pub fn merge_basic_stats(a: &BasicStats, b: &BasicStats) -> BasicStats {
    BasicStats {
        num_pixels: a.num_pixels + b.num_pixels,
        sum: a.sum + b.sum,
        sum_sq: a.sum_sq + b.sum_sq,
        min: a.min.min(b.min),
        max: a.max.max(b.max),
        mean: f64::NAN,
        std_dev: f64::NAN,
        rms: f64::NAN,
    }
}

/// Derives `mean`/`std_dev`/`rms` from the accumulated sums once all
/// chunks are merged; left `NaN` for an empty accumulation.
fn finalize(mut s: BasicStats) -> BasicStats {
    if s.num_pixels > 0 {
        let n = s.num_pixels as f64;
        s.mean = s.sum / n;
        let variance = (s.sum_sq / n - s.mean * s.mean).max(0.0);
        s.std_dev = variance.sqrt();
        s.rms = (s.sum_sq / n).sqrt();
    }
    s
}

/// Builds a fixed-bounds histogram over `data` in parallel, skipping
/// NaN/Inf pixels. The first and last bins are closed on both sides (a
/// value exactly at `max` lands in the last bin rather than overflowing);
/// interior bins are half-open `[lo, hi)`.
pub fn compute_histogram(data: &[f32], num_bins: usize, min: f64, max: f64) -> Histogram {
    if num_bins == 0 || !(max > min) {
        return Histogram::empty();
    }
    let bin_width = (max - min) / num_bins as f64;
    let counts = data
        .par_chunks(PAR_CHUNK)
        .map(|chunk| bin_chunk(chunk, num_bins, min, bin_width))
        .reduce(
            || vec![0i64; num_bins],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b.iter()) {
                    *x += y;
                }
                a
            },
        );
    Histogram {
        min,
        max,
        bin_width,
        bin_center: min + bin_width / 2.0,
        counts,
    }
}

fn bin_chunk(chunk: &[f32], num_bins: usize, min: f64, bin_width: f64) -> Vec<i64> {
    let mut counts = vec![0i64; num_bins];
    for &v in chunk {
        if !is_finite(v) {
            continue;
        }
        let v = v as f64;
        if v < min || v > min + bin_width * num_bins as f64 {
            continue;
        }
        let idx = ((v - min) / bin_width).floor() as i64;
        let idx = idx.clamp(0, num_bins as i64 - 1) as usize;
        counts[idx] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn basic_stats_matches_hand_computed_values() {
        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0, f32::NAN, f32::INFINITY];
        let stats = compute_basic_stats(&data);
        assert_eq!(stats.num_pixels, 4);
        assert_abs_diff_eq!(stats.mean, 2.5, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.min, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.max, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn merge_is_associative_with_direct_computation() {
        let data: Vec<f32> = (0..5000).map(|i| i as f32 * 0.01).collect();
        let whole = compute_basic_stats(&data);
        let (left, right) = data.split_at(2000);
        let merged = merge_basic_stats(&accumulate_chunk(left), &accumulate_chunk(right));
        let merged = finalize(merged);
        assert_abs_diff_eq!(merged.sum, whole.sum, epsilon = 1e-6);
        assert_eq!(merged.num_pixels, whole.num_pixels);
    }

    #[test]
    fn histogram_bounds_are_closed_on_both_ends() {
        let data = vec![0.0f32, 10.0, 5.0];
        let h = compute_histogram(&data, 10, 0.0, 10.0);
        assert_eq!(h.counts[0], 1);
        assert_eq!(h.counts[9], 1); // v == max lands in the last bin
        assert_eq!(h.total_count(), 3);
    }

    #[test]
    fn empty_bounds_returns_cleared_histogram() {
        let h = compute_histogram(&[1.0, 2.0], 10, 5.0, 5.0);
        assert!(h.is_cleared());
    }
}
