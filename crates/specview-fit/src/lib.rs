//! Nonlinear least-squares 2-D multi-Gaussian image fitting.
//!
//! Fits a shared background plus one or more rotated 2-D Gaussian
//! components against a rectangular patch of pixels, with per-parameter
//! freezing, method-of-moments seeding, and SNR-based analytical error
//! estimates on the derived integrated flux.

mod error;
mod fit;
mod model;
mod moments;
mod solver;

pub use error::{Error, Result};
pub use fit::{fit_region, FitResult, FittedComponent};
pub use model::{FitConfig, GaussianComponent, ParamKind};
pub use moments::{mad_sigma, seed_from_moments};
