//! Histogram and BasicStats data model.
//!
//! This module defines the *shapes* of these two value types only; the
//! parallel accumulation and join algorithms that build and combine them
//! live in `specview-compute`, which depends on this crate for the types.

/// `{min, max, bin_width, bin_center, counts[N]}`.
///
/// Invariants (enforced by the builder in `specview-compute`, not here):
/// `bin_width = (max - min) / N`; a value `v` with `min <= v <= max` falls in
/// bin `clamp((v - min) / bin_width, 0, N - 1)`; NaN/±Inf are excluded; the
/// first and last bins are closed on both sides, interior bins are
/// half-open `[lo, hi)`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub bin_center: f64,
    pub counts: Vec<i64>,
}

impl Histogram {
    /// Identity-created histogram: size 0 means "cleared".
    pub fn empty() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            bin_width: 0.0,
            bin_center: 0.0,
            counts: Vec::new(),
        }
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_cleared(&self) -> bool {
        self.counts.is_empty()
    }

    /// Two histograms with equal `N` and equal bounds are addable by
    /// element-wise sum.
    pub fn is_compatible(&self, other: &Histogram) -> bool {
        self.num_bins() == other.num_bins() && self.min == other.min && self.max == other.max
    }

    /// Element-wise sum; panics (via debug assertion in the caller) if
    /// bounds/size don't match — callers must check `is_compatible` first.
    pub fn add(&self, other: &Histogram) -> Histogram {
        debug_assert!(self.is_compatible(other));
        let counts = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .map(|(a, b)| a + b)
            .collect();
        Histogram {
            counts,
            ..self.clone()
        }
    }

    #[inline]
    pub fn total_count(&self) -> i64 {
        self.counts.iter().sum()
    }
}

/// `{num_pixels, sum, mean, stdDev, min, max, rms, sumSq}`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BasicStats {
    pub num_pixels: i64,
    pub sum: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
    pub sum_sq: f64,
}

impl BasicStats {
    pub fn empty() -> Self {
        Self {
            num_pixels: 0,
            sum: 0.0,
            mean: f64::NAN,
            std_dev: f64::NAN,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            rms: f64::NAN,
            sum_sq: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_empty_is_cleared() {
        let h = Histogram::empty();
        assert!(h.is_cleared());
        assert_eq!(h.total_count(), 0);
    }

    #[test]
    fn histogram_add_sums_counts() {
        let a = Histogram {
            min: 0.0,
            max: 10.0,
            bin_width: 1.0,
            bin_center: 0.5,
            counts: vec![1, 2, 3],
        };
        let b = Histogram {
            counts: vec![4, 5, 6],
            ..a.clone()
        };
        let c = a.add(&b);
        assert_eq!(c.counts, vec![5, 7, 9]);
    }

    #[test]
    fn histogram_incompatible_bounds_detected() {
        let a = Histogram {
            min: 0.0,
            max: 10.0,
            bin_width: 1.0,
            bin_center: 0.5,
            counts: vec![1, 2, 3],
        };
        let b = Histogram {
            min: 1.0,
            ..a.clone()
        };
        assert!(!a.is_compatible(&b));
    }
}
