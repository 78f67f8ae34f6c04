//! # specview-region
//!
//! Region state (C6): per-region requirement mirroring of Frame
//! operations, PV image generation with preview throttling, fit
//! delegation, and region file import/export.

pub mod error;
pub mod export;
pub mod handler;
pub mod region;

pub use error::{Error, Result};
pub use export::export_stats_csv;
pub use handler::{PvImage, RegionHandler};
pub use region::{ModificationEffect, RegionState, RegionType};
