//! # specview-frame
//!
//! The Frame state machine (C4) and requirements cache (C5): owns a
//! loader handle, the current-plane cache, and the per-region computed
//! product cache for a single opened image.

pub mod error;
pub mod frame;
pub mod plane_cache;
pub mod requirements;

pub use error::{Error, Result};
pub use frame::{ContourChunk, Frame, FrameState, RasterTile, SmoothingMode};
pub use requirements::{CacheId, ConfigId, RequirementsCache, StatKind};
