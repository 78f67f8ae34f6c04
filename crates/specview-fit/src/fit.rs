//! Entry point: nonlinear least-squares 2-D multi-Gaussian fitting.

use nalgebra::DVector;

use specview_core::loader::ProgressMonitor;

use crate::error::{Error, Result};
use crate::model::{FitConfig, GaussianComponent};
use crate::moments::{mad_sigma, seed_from_moments};
use crate::solver::{self, ResidualModel};

/// Per-component fitted values with 1-sigma errors, plus the shared
/// background and a derived integrated flux (and its error) per
/// component.
#[derive(Debug, Clone)]
pub struct FittedComponent {
    pub value: GaussianComponent,
    pub errors: GaussianComponent,
    pub integrated_flux: f64,
    pub integrated_flux_error: f64,
}

#[derive(Debug, Clone)]
pub struct FitResult {
    pub background: f64,
    pub background_error: f64,
    pub components: Vec<FittedComponent>,
    pub converged: bool,
    pub iterations: usize,
    pub reduced_chi_sq: f64,
}

struct ImageProblem<'a> {
    data: &'a [f32],
    width: i64,
    height: i64,
    weight: f64,
    n_components: usize,
    cancel: &'a dyn Fn() -> bool,
}

fn evaluate_full(full_params: &[f64], n_components: usize, x: f64, y: f64) -> f64 {
    let mut v = full_params[0];
    for k in 0..n_components {
        let base = 1 + k * 6;
        let comp = GaussianComponent {
            cx: full_params[base],
            cy: full_params[base + 1],
            amp: full_params[base + 2],
            fwhm_x: full_params[base + 3],
            fwhm_y: full_params[base + 4],
            pa: full_params[base + 5],
        };
        v += comp.evaluate(x, y);
    }
    v
}

impl<'a> ResidualModel for ImageProblem<'a> {
    fn residuals(&self, full_params: &[f64]) -> DVector<f64> {
        let n = (self.width * self.height) as usize;
        if (self.cancel)() {
            // Cancellation makes every residual vanish so the damped
            // Gauss-Newton loop sees zero cost and stops on the next
            // iteration instead of running to `max_iterations`.
            return DVector::zeros(n);
        }
        let sqrt_w = self.weight.sqrt();
        let mut out = DVector::zeros(n);
        let mut i = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                let pixel = self.data[i];
                if pixel.is_finite() {
                    let model = evaluate_full(full_params, self.n_components, x as f64, y as f64);
                    out[i] = (model - pixel as f64) * sqrt_w;
                }
                i += 1;
            }
        }
        out
    }
}

/// Fits `config.components` (plus shared background) against `pixels`
/// (`width x height`, row-major, `NaN` for masked-out pixels). Uses
/// `config.components`/`config.background` as the initial guess, unless
/// `config.seed_from_moments` asks for a method-of-moments seed instead.
/// `cancel` is polled on every residual evaluation; the fitter treats a
/// cancellation identically to reaching `max_iterations`, returning
/// whatever the solver last converged toward.
pub fn fit_region(
    config: &FitConfig,
    pixels: &[f32],
    width: i64,
    height: i64,
    progress: &mut ProgressMonitor<'_>,
    cancel: &dyn Fn() -> bool,
) -> Result<FitResult> {
    if pixels.is_empty() || width <= 0 || height <= 0 {
        return Err(Error::EmptyRegion);
    }
    if pixels.len() as i64 != width * height {
        return Err(Error::InvalidConfig(format!(
            "pixel buffer length {} does not match {}x{}",
            pixels.len(),
            width,
            height
        )));
    }
    if config.components.is_empty() {
        return Err(Error::InvalidConfig("no components to fit".into()));
    }
    if config.fixed.len() != config.param_count() {
        return Err(Error::InvalidConfig(format!(
            "fixed mask has {} entries, expected {}",
            config.fixed.len(),
            config.param_count()
        )));
    }

    let sigma = mad_sigma(pixels);
    let weight = 1.0 / (sigma * sigma);

    let initial = if config.seed_from_moments {
        let (background, comp) = seed_from_moments(pixels, width, height);
        let mut flattened = vec![background];
        // Only the first component gets a moments seed; any further
        // declared components keep their configured initial values —
        // moment seeding only finds one centroid.
        flattened.extend_from_slice(&[comp.cx, comp.cy, comp.amp, comp.fwhm_x, comp.fwhm_y, comp.pa]);
        for extra in config.components.iter().skip(1) {
            flattened.extend_from_slice(&[extra.cx, extra.cy, extra.amp, extra.fwhm_x, extra.fwhm_y, extra.pa]);
        }
        flattened
    } else {
        config.flatten()
    };

    let free_indices: Vec<usize> = config
        .fixed
        .iter()
        .enumerate()
        .filter_map(|(i, &fixed)| if fixed { None } else { Some(i) })
        .collect();

    let problem = ImageProblem {
        data: pixels,
        width,
        height,
        weight,
        n_components: config.components.len(),
        cancel,
    };

    let outcome = solver::solve(&problem, &initial, &free_indices, config.max_iterations.max(1), progress);

    let residuals = problem.residuals(&outcome.params);
    let n_pixels_finite = pixels.iter().filter(|v| v.is_finite()).count();
    let dof = (n_pixels_finite.saturating_sub(free_indices.len())).max(1) as f64;
    let reduced_chi_sq = residuals.iter().map(|r| r * r).sum::<f64>() / dof;

    let mut full_errors = vec![0.0f64; config.param_count()];
    for (col, &idx) in free_indices.iter().enumerate() {
        if let Some(Some(var)) = outcome.covariance_diag.get(col) {
            full_errors[idx] = (var * reduced_chi_sq).sqrt();
        }
    }

    let (background, components) = config.unflatten(&outcome.params);
    let (background_error, component_errors) = config.unflatten(&full_errors);

    // SNR-based error model: flux error scales with the per-pixel noise
    // sigma and the effective beam area rather than with the covariance
    // propagation alone, matching the analytical estimator the formula
    // in the module doc comment derives `integrated_flux` from.
    let fitted = components
        .into_iter()
        .zip(component_errors)
        .map(|(value, errors)| {
            let integrated_flux = value.integrated_flux(config.beam_area);
            let snr = (value.amp / sigma).max(1e-9);
            let integrated_flux_error = integrated_flux / snr;
            FittedComponent {
                value,
                errors,
                integrated_flux,
                integrated_flux_error,
            }
        })
        .collect();

    Ok(FitResult {
        background,
        background_error,
        components: fitted,
        converged: outcome.converged,
        iterations: outcome.iterations,
        reduced_chi_sq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_bump(width: i64, height: i64, cx: f64, cy: f64, amp: f64, fwhm: f64) -> Vec<f32> {
        let mut data = vec![0.0f32; (width * height) as usize];
        let comp = GaussianComponent {
            cx,
            cy,
            amp,
            fwhm_x: fwhm,
            fwhm_y: fwhm,
            pa: 0.0,
        };
        for y in 0..height {
            for x in 0..width {
                data[(y * width + x) as usize] = comp.evaluate(x as f64, y as f64) as f32;
            }
        }
        data
    }

    fn base_config(n_components: usize) -> FitConfig {
        FitConfig {
            components: (0..n_components)
                .map(|_| GaussianComponent {
                    cx: 9.0,
                    cy: 9.0,
                    amp: 8.0,
                    fwhm_x: 4.0,
                    fwhm_y: 4.0,
                    pa: 0.0,
                })
                .collect(),
            background: 0.0,
            fixed: vec![false; 1 + 6 * n_components],
            beam_area: 1.0,
            seed_from_moments: false,
            max_iterations: 200,
        }
    }

    #[test]
    fn recovers_a_single_bright_gaussian() {
        let data = synthetic_bump(21, 21, 10.0, 10.0, 10.0, 5.0);
        let config = base_config(1);
        let mut progress = |_f: f64| {};
        let cancel = || false;
        let result = fit_region(&config, &data, 21, 21, &mut progress, &cancel).unwrap();
        let fitted = &result.components[0].value;
        assert!((fitted.cx - 10.0).abs() < 0.3);
        assert!((fitted.cy - 10.0).abs() < 0.3);
        assert!((fitted.amp - 10.0).abs() < 1.0);
    }

    #[test]
    fn fixed_background_stays_at_initial_value() {
        let data = synthetic_bump(15, 15, 7.0, 7.0, 5.0, 3.0);
        let mut config = base_config(1);
        config.background = 1.25;
        config.fixed[0] = true;
        let mut progress = |_f: f64| {};
        let cancel = || false;
        let result = fit_region(&config, &data, 15, 15, &mut progress, &cancel).unwrap();
        assert_eq!(result.background, 1.25);
    }

    #[test]
    fn cancellation_stops_without_error() {
        let data = synthetic_bump(15, 15, 7.0, 7.0, 5.0, 3.0);
        let config = base_config(1);
        let mut progress = |_f: f64| {};
        let cancel = || true;
        let result = fit_region(&config, &data, 15, 15, &mut progress, &cancel).unwrap();
        assert_eq!(result.components.len(), 1);
    }

    #[test]
    fn empty_region_is_rejected() {
        let config = base_config(1);
        let mut progress = |_f: f64| {};
        let cancel = || false;
        let err = fit_region(&config, &[], 0, 0, &mut progress, &cancel).unwrap_err();
        assert!(matches!(err, Error::EmptyRegion));
    }
}
