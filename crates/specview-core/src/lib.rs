//! # specview-core
//!
//! Shared geometry, error types, and collaborator contracts for the
//! specview backend.
//!
//! - [`error`] - `Error`/`Result`, plus the wire-level `ErrorData` severity
//!   contract used to report a failure without ever killing a session.
//! - [`rect`] - `Rect`, an axis-aligned region in image-pixel coordinates.
//! - [`axes`] - `ImageShape`/`PlaneCoord`, cube dimensionality bookkeeping.
//! - [`histogram`] - `Histogram`/`BasicStats` value types.
//! - [`tile`] - tile address encoding and layer/mip conversion.
//! - [`loader`] - narrow collaborator traits (`FileLoader`,
//!   `CoordinateSystem`, region import/export, moment generation) that the
//!   rest of the workspace depends on instead of a concrete image stack.
//! - [`timer`] - a small wall-clock stopwatch for self-timing code paths.
//!
//! ## Crate structure
//!
//! This crate has no internal workspace dependencies; every other
//! `specview-*` crate depends on it:
//!
//! ```text
//! specview-core (this crate)
//!    ^
//!    +-- specview-compute (numeric kernels, histogram/stats algorithms)
//!    +-- specview-frame   (tile cache, requirements cache)
//!    +-- specview-region  (region state, PV, export)
//!    +-- specview-fit     (2-D Gaussian fitting)
//!    +-- specview-session (session/animation/task runtime)
//!    +-- specview-wire    (message framing and payloads)
//! ```

pub mod axes;
pub mod error;
pub mod histogram;
pub mod loader;
pub mod rect;
pub mod timer;
pub mod tile;

pub use axes::{ImageShape, PlaneCoord};
pub use error::{Error, ErrorData, ErrorSeverity, Result};
pub use histogram::{BasicStats, Histogram};
pub use rect::Rect;
pub use tile::{TileCoord, MAX_LAYER, TILE_SIZE};
pub use timer::Timer;

/// Prelude module for convenient imports.
///
/// ```
/// use specview_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::axes::{ImageShape, PlaneCoord};
    pub use crate::error::{Error, ErrorData, ErrorSeverity, Result};
    pub use crate::histogram::{BasicStats, Histogram};
    pub use crate::loader::{
        CoordinateSystem, FileLoader, GeneratedImage, ImportedRegion, MomentGenerator,
        ProgressMonitor, RegionFileFormat, RegionMask, Slicer,
    };
    pub use crate::rect::Rect;
    pub use crate::tile::{TileCoord, MAX_LAYER, TILE_SIZE};
    pub use crate::timer::Timer;
}
