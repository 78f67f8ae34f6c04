//! Method-of-moments seeding and MAD-based weighting.

use crate::model::GaussianComponent;

/// Median absolute deviation, scaled by the usual `1.4826` factor so it
/// estimates a normal distribution's standard deviation. Used to derive
/// the uniform per-pixel weight `1/sigma^2` for the least-squares fit.
pub fn mad_sigma(data: &[f32]) -> f64 {
    if data.is_empty() {
        return 1.0;
    }
    let mut sorted: Vec<f64> = data.iter().map(|v| *v as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = percentile(&sorted, 0.5);
    let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - median).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    let mad = percentile(&deviations, 0.5);
    (mad * 1.4826).max(1e-9)
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx]
}

/// Seeds a single Gaussian component from the zeroth/first/second
/// intensity-weighted moments of `data` (`width x height`, row-major).
/// `background` is seeded as the data's median.
pub fn seed_from_moments(data: &[f32], width: i64, height: i64) -> (f64, GaussianComponent) {
    let background = {
        let mut sorted: Vec<f64> = data.iter().filter(|v| v.is_finite()).map(|v| *v as f64).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        percentile(&sorted, 0.5)
    };

    let mut m0 = 0.0f64;
    let mut mx = 0.0f64;
    let mut my = 0.0f64;
    let mut peak = f32::NEG_INFINITY;
    let mut peak_xy = (width as f64 / 2.0, height as f64 / 2.0);

    for y in 0..height {
        for x in 0..width {
            let v = data[(y * width + x) as usize];
            if !v.is_finite() {
                continue;
            }
            let weight = (v as f64 - background).max(0.0);
            m0 += weight;
            mx += weight * x as f64;
            my += weight * y as f64;
            if v > peak {
                peak = v;
                peak_xy = (x as f64, y as f64);
            }
        }
    }

    let (cx, cy) = if m0 > 0.0 { (mx / m0, my / m0) } else { peak_xy };

    let mut mxx = 0.0f64;
    let mut myy = 0.0f64;
    let mut mxy = 0.0f64;
    for y in 0..height {
        for x in 0..width {
            let v = data[(y * width + x) as usize];
            if !v.is_finite() {
                continue;
            }
            let weight = (v as f64 - background).max(0.0);
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            mxx += weight * dx * dx;
            myy += weight * dy * dy;
            mxy += weight * dx * dy;
        }
    }
    if m0 > 0.0 {
        mxx /= m0;
        myy /= m0;
        mxy /= m0;
    }

    // principal-axis decomposition of the second-moment tensor
    let trace = mxx + myy;
    let diff = mxx - myy;
    let radius = (diff * diff + 4.0 * mxy * mxy).sqrt();
    let lambda1 = ((trace + radius) / 2.0).max(1e-6);
    let lambda2 = ((trace - radius) / 2.0).max(1e-6);
    let pa = 0.5 * (2.0 * mxy).atan2(diff);

    const SIGMA_TO_FWHM: f64 = 2.354_820_045;
    let fwhm_x = lambda1.sqrt() * SIGMA_TO_FWHM;
    let fwhm_y = lambda2.sqrt() * SIGMA_TO_FWHM;

    let component = GaussianComponent {
        cx,
        cy,
        amp: (peak as f64 - background).max(1e-6),
        fwhm_x: fwhm_x.max(1.0),
        fwhm_y: fwhm_y.max(1.0),
        pa,
    };
    (background, component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mad_sigma_of_constant_data_is_tiny() {
        let data = vec![5.0f32; 100];
        assert!(mad_sigma(&data) < 1e-6);
    }

    #[test]
    fn seed_from_moments_finds_centroid_of_symmetric_bump() {
        let (w, h) = (21i64, 21i64);
        let mut data = vec![0.0f32; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                let dx = (x - 10) as f64;
                let dy = (y - 10) as f64;
                let v = 10.0 * (-(dx * dx + dy * dy) / 8.0).exp();
                data[(y * w + x) as usize] = v as f32;
            }
        }
        let (_bg, comp) = seed_from_moments(&data, w, h);
        assert_abs_diff_eq!(comp.cx, 10.0, epsilon = 0.5);
        assert_abs_diff_eq!(comp.cy, 10.0, epsilon = 0.5);
    }
}
