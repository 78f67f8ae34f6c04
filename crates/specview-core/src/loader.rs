//! Narrow collaborator contracts.
//!
//! These traits are the *entire* surface the core pipeline knows about the
//! underlying astronomy I/O stack, the world-coordinate-system library, the
//! region file parsers, and the moment generator. Concrete FITS/HDF5/CASA/
//! MIRIAD readers, WCS math, and CRTF/DS9 parsers are supplied by a caller;
//! this module exists so the rest of the crate can depend on *an*
//! implementation without knowing which one — deep image inheritance
//! replaced by a narrow capability set.

use crate::axes::ImageShape;
use crate::error::Result;
use crate::histogram::BasicStats;

/// A rectangular read request along arbitrary axes of the underlying cube,
/// e.g. "every pixel of plane (z, s)" or "the spectral line through (x, y)".
#[derive(Debug, Clone)]
pub struct Slicer {
    /// Per-axis `(start, count)` in loader-native axis order.
    pub ranges: Vec<(i64, i64)>,
}

impl Slicer {
    pub fn plane(z: i64, s: i64) -> Self {
        Self {
            ranges: vec![(0, -1), (0, -1), (z, 1), (s, 1)],
        }
    }

    pub fn spectral_cursor(x: i64, y: i64, s: i64) -> Self {
        Self {
            ranges: vec![(x, 1), (y, 1), (0, -1), (s, 1)],
        }
    }
}

/// A resolved region, expressed as a bounding box plus an optional per-pixel
/// mask (dense boolean buffer, row-major within the bounding box). `None`
/// mask means "every pixel in the bounding box is included" (e.g. a
/// rectangle region needs no mask).
#[derive(Debug, Clone)]
pub struct RegionMask {
    pub bounds: crate::rect::Rect,
    pub mask: Option<Vec<bool>>,
}

impl RegionMask {
    pub fn rectangular(bounds: crate::rect::Rect) -> Self {
        Self { bounds, mask: None }
    }

    #[inline]
    pub fn includes(&self, local_x: i64, local_y: i64) -> bool {
        match &self.mask {
            None => true,
            Some(bits) => {
                let idx = (local_y * self.bounds.width + local_x) as usize;
                bits.get(idx).copied().unwrap_or(false)
            }
        }
    }
}

/// Capability set for reading pixel data from an opened astronomy image.
///
/// Implementations wrap FITS/HDF5/CASA/MIRIAD (or an in-memory image
/// produced by moments/PV/fit); the core never matches on concrete image
/// types, only on these operations.
pub trait FileLoader: Send + Sync {
    /// Opens the given HDU (header/data unit) within the backing file.
    fn open_file(&mut self, hdu: &str) -> Result<()>;

    /// Discovers the cube shape and which raw axis indices carry the
    /// spectral (Z) and stokes (S) dimensions.
    fn find_coordinate_axes(&self) -> Result<(ImageShape, Option<usize>, Option<usize>)>;

    /// Reads the full current plane (X, Y only).
    fn get_image(&self) -> Result<Vec<f32>>;

    /// Reads an arbitrary axis-aligned slice.
    fn get_slice(&self, slicer: &Slicer) -> Result<Vec<f32>>;

    /// Reads a region's worth of pixels from the current plane into `out`
    /// (row-major within the region's bounding box).
    fn get_sub_image(&self, region: &RegionMask, out: &mut [f32]) -> Result<()>;

    /// Reads the spectral profile through a single cursor pixel.
    fn get_cursor_spectral_data(&self, x: i64, y: i64, stokes: i64) -> Result<Vec<f32>>;

    /// Reads per-channel values for every pixel inside a region (used by
    /// region spectral-profile/PV computation).
    fn get_region_spectral_data(&self, region: &RegionMask, stokes: i64) -> Result<Vec<f32>>;

    /// Whether a pre-computed mipmap dataset exists at downsample factor
    /// `n` (HDF5 images may ship these; FITS never does).
    fn has_mip(&self, n: i64) -> bool;

    /// Loader-provided precomputed statistics for a plane, if the backing
    /// format stores them. The requirements cache prefers these over a
    /// recomputed histogram whenever the bin counts match.
    fn get_image_stats(&self, stokes: i64, z: i64) -> Option<BasicStats>;
}

/// World-coordinate-system accessor.
pub trait CoordinateSystem: Send + Sync {
    fn axis_type(&self, axis: usize) -> String;
    fn projection(&self) -> String;
    fn reference_pixel(&self, axis: usize) -> f64;
    fn reference_value(&self, axis: usize) -> f64;
    fn increment(&self, axis: usize) -> f64;
    fn equinox(&self) -> Option<f64>;
    fn radesys(&self) -> Option<String>;
}

/// A region definition read from or written to an on-disk region file
/// (CRTF, DS9, ...). Field shapes mirror the in-memory `Region state`
/// exactly; the parser/writer for a given file type is external.
#[derive(Debug, Clone)]
pub struct ImportedRegion {
    pub region_type: String,
    pub control_points: Vec<(f64, f64)>,
    pub rotation_deg: f64,
}

/// Region file import/export, keyed by file type (CRTF, DS9, ...).
pub trait RegionFileFormat: Send + Sync {
    fn format_name(&self) -> &'static str;
    fn import(&self, path: &std::path::Path) -> Result<Vec<ImportedRegion>>;
    fn export(&self, path: &std::path::Path, regions: &[ImportedRegion]) -> Result<()>;
}

/// Progress callback used by the moment generator (and reused by other
/// long-running external calls).
pub type ProgressMonitor<'a> = dyn FnMut(f64) + Send + 'a;

/// A 2-D image produced by collapsing a cube along its spectral axis.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub name: String,
    pub width: i64,
    pub height: i64,
    pub data: Vec<f32>,
}

/// Moment-map generation: `SetMoments`, `SetMomentAxis`,
/// `SetInExcludeRange`, `CreateMoments`.
pub trait MomentGenerator: Send {
    fn set_moments(&mut self, moments: &[i32]);
    fn set_moment_axis(&mut self, axis: usize);
    fn set_in_exclude_range(&mut self, include: bool, range: (f64, f64));
    fn create_moments(&mut self, progress: &mut ProgressMonitor<'_>) -> Result<Vec<GeneratedImage>>;
}
