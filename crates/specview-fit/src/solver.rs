//! A small Levenberg-Marquardt solver over `nalgebra` dense matrices.
//!
//! Builds directly on `nalgebra` rather than binding an external LM crate
//! — the fixed-parameter index-redirect and the "zero the residuals to
//! force immediate convergence" cancellation rule are both easiest to
//! express against a hand-rolled damped Gauss-Newton loop than against a
//! generic trait designed around a fixed parameter count.

use nalgebra::{DMatrix, DVector};

use specview_core::loader::ProgressMonitor;

/// Evaluates the residual vector (already weighted) for a parameter
/// vector. Implementors decide what "residual" means; the solver only
/// needs the vector and its Jacobian.
pub trait ResidualModel {
    fn residuals(&self, full_params: &[f64]) -> DVector<f64>;
}

fn cost(residuals: &DVector<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Central-difference Jacobian with respect to the free parameters only
/// (columns indexed by `free_indices` into the full parameter vector).
fn numeric_jacobian(model: &dyn ResidualModel, full_params: &[f64], free_indices: &[usize], step: f64) -> DMatrix<f64> {
    let base = model.residuals(full_params);
    let n_rows = base.len();
    let mut jac = DMatrix::<f64>::zeros(n_rows, free_indices.len());
    for (col, &idx) in free_indices.iter().enumerate() {
        let mut perturbed = full_params.to_vec();
        let h = step.max(perturbed[idx].abs() * step);
        perturbed[idx] += h;
        let plus = model.residuals(&perturbed);
        perturbed[idx] -= 2.0 * h;
        let minus = model.residuals(&perturbed);
        for row in 0..n_rows {
            jac[(row, col)] = (plus[row] - minus[row]) / (2.0 * h);
        }
    }
    jac
}

pub struct SolveOutcome {
    pub params: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    /// Diagonal of `(J^T J)^-1`, in the order of `free_indices`; `None`
    /// entries mark a singular direction the pseudo-inverse couldn't
    /// resolve.
    pub covariance_diag: Vec<Option<f64>>,
}

/// Runs damped Gauss-Newton (Levenberg-Marquardt) starting from
/// `initial_full`, optimizing only the parameters named in
/// `free_indices`. Calls `progress` once per iteration with the fraction
/// of `max_iterations` consumed so far (matching the original's
/// per-iteration GSL callback).
pub fn solve(
    model: &dyn ResidualModel,
    initial_full: &[f64],
    free_indices: &[usize],
    max_iterations: usize,
    progress: &mut ProgressMonitor<'_>,
) -> SolveOutcome {
    let mut full = initial_full.to_vec();
    let mut lambda = 1e-3f64;
    let mut current_cost = cost(&model.residuals(&full));
    let mut converged = false;
    let mut last_jtj = DMatrix::<f64>::zeros(free_indices.len(), free_indices.len());

    let mut iterations = 0;
    for iter in 0..max_iterations.max(1) {
        iterations = iter + 1;
        progress(iter as f64 / max_iterations.max(1) as f64);

        let jac = numeric_jacobian(model, &full, free_indices, 1e-4);
        let residuals = model.residuals(&full);
        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let jtr = &jt * &residuals;
        last_jtj = jtj.clone();

        let mut damped = jtj.clone();
        for i in 0..damped.nrows() {
            damped[(i, i)] += lambda * damped[(i, i)].max(1e-12);
        }

        let delta = match damped.clone().lu().solve(&(-jtr)) {
            Some(d) => d,
            None => break,
        };

        let mut trial = full.clone();
        for (col, &idx) in free_indices.iter().enumerate() {
            trial[idx] += delta[col];
        }
        let trial_cost = cost(&model.residuals(&trial));

        if trial_cost < current_cost {
            let improvement = (current_cost - trial_cost) / current_cost.max(1e-12);
            full = trial;
            current_cost = trial_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement < 1e-8 {
                converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    let covariance_diag = last_jtj
        .clone()
        .try_inverse()
        .map(|inv| (0..inv.nrows()).map(|i| Some(inv[(i, i)].abs())).collect())
        .unwrap_or_else(|| vec![None; free_indices.len()]);

    SolveOutcome {
        params: full,
        converged,
        iterations,
        covariance_diag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct Line;
    impl ResidualModel for Line {
        fn residuals(&self, p: &[f64]) -> DVector<f64> {
            // y = p[0]*x + p[1], fit against a perfect line through (0,1),(1,3),(2,5)
            let xs = [0.0, 1.0, 2.0];
            let ys = [1.0, 3.0, 5.0];
            DVector::from_iterator(3, xs.iter().zip(ys.iter()).map(|(&x, &y)| p[0] * x + p[1] - y))
        }
    }

    #[test]
    fn solves_linear_regression_exactly() {
        let mut calls = 0usize;
        let mut progress = |_frac: f64| calls += 1;
        let outcome = solve(&Line, &[0.0, 0.0], &[0, 1], 50, &mut progress);
        assert_abs_diff_eq!(outcome.params[0], 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(outcome.params[1], 1.0, epsilon = 1e-4);
        assert!(calls > 0);
    }

    #[test]
    fn fixed_parameter_is_never_perturbed() {
        let mut progress = |_frac: f64| {};
        // only optimize slope; intercept index 1 is fixed at 0.5 and excluded from free_indices
        let outcome = solve(&Line, &[0.0, 0.5], &[0], 50, &mut progress);
        assert_eq!(outcome.params[1], 0.5);
    }
}
