//! Cube shape and axis bookkeeping.
//!
//! A cube has up to four axes: X, Y (spatial render axes), Z (spectral
//! channel), S (stokes/polarization), with raw dimensions discovered from
//! the external loader — this module is the typed home for that discovery
//! result.

use crate::error::{Error, Result};

/// Discovered shape of an opened image, in loader-native axis order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub width: i64,
    pub height: i64,
    /// Number of spectral channels. `1` for a plain 2-D image.
    pub depth: i64,
    /// Number of stokes/polarization planes. `1` if absent.
    pub stokes: i64,
}

impl ImageShape {
    /// Builds a shape from a raw dimension list as reported by a loader,
    /// together with which axis indices were identified as the spectral and
    /// stokes axes (`None` if the cube doesn't have that axis).
    pub fn from_dims(dims: &[i64], z_axis: Option<usize>, stokes_axis: Option<usize>) -> Result<Self> {
        if dims.len() < 2 || dims.len() > 4 {
            return Err(Error::UnsupportedDimensionality { ndim: dims.len() });
        }
        let width = dims[0];
        let height = dims[1];
        let depth = z_axis.and_then(|i| dims.get(i).copied()).unwrap_or(1);
        let stokes = stokes_axis.and_then(|i| dims.get(i).copied()).unwrap_or(1);
        Ok(Self {
            width,
            height,
            depth,
            stokes,
        })
    }

    #[inline]
    pub fn is_cube(&self) -> bool {
        self.depth > 1
    }

    #[inline]
    pub fn has_stokes(&self) -> bool {
        self.stokes > 1
    }

    pub fn validate_channel(&self, z: i64) -> Result<()> {
        if z < 0 || z >= self.depth {
            return Err(Error::AxisOutOfBounds {
                index: z,
                size: self.depth,
            });
        }
        Ok(())
    }

    pub fn validate_stokes(&self, s: i64) -> Result<()> {
        if s < 0 || s >= self.stokes {
            return Err(Error::AxisOutOfBounds {
                index: s,
                size: self.stokes,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn plane_pixels(&self) -> usize {
        (self.width.max(0) * self.height.max(0)) as usize
    }
}

/// A single `(channel, stokes)` coordinate selecting the current plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PlaneCoord {
    pub channel: i64,
    pub stokes: i64,
}

impl PlaneCoord {
    pub fn new(channel: i64, stokes: i64) -> Self {
        Self { channel, stokes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dims_2d_defaults_depth_and_stokes_to_one() {
        let shape = ImageShape::from_dims(&[640, 800], None, None).unwrap();
        assert_eq!(shape.depth, 1);
        assert_eq!(shape.stokes, 1);
        assert!(!shape.is_cube());
    }

    #[test]
    fn from_dims_4d_cube() {
        let shape = ImageShape::from_dims(&[640, 800, 25, 2], Some(2), Some(3)).unwrap();
        assert_eq!(shape.depth, 25);
        assert_eq!(shape.stokes, 2);
        assert!(shape.is_cube());
        assert!(shape.has_stokes());
    }

    #[test]
    fn rejects_bad_dimensionality() {
        assert!(ImageShape::from_dims(&[10], None, None).is_err());
        assert!(ImageShape::from_dims(&[1, 2, 3, 4, 5], None, None).is_err());
    }

    #[test]
    fn validates_bounds() {
        let shape = ImageShape::from_dims(&[10, 10, 5, 1], Some(2), None).unwrap();
        assert!(shape.validate_channel(0).is_ok());
        assert!(shape.validate_channel(4).is_ok());
        assert!(shape.validate_channel(5).is_err());
        assert!(shape.validate_channel(-1).is_err());
    }
}
