//! Frame (C4): the state machine, plane cache, and per-plane operations
//! for a single opened image.

use std::sync::Mutex;

use specview_core::loader::{FileLoader, MomentGenerator, ProgressMonitor, RegionMask, Slicer};
use specview_core::{BasicStats, Histogram, ImageShape, PlaneCoord, Rect, TileCoord, Timer, TILE_SIZE};
use specview_compute as kernels;

use crate::error::{Error, Result};
use crate::plane_cache::PlaneCache;
use crate::requirements::{CacheId, RequirementsCache};

/// Self-timing target for each spectral-profile block (milliseconds); a
/// block's own wall-clock cost feeds back into the next block's size.
pub const TARGET_DELTA_TIME_MS: u64 = 200;
/// How often a partial spectral-profile result is flushed to the caller.
pub const TARGET_PARTIAL_CURSOR_TIME_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Loading,
    Loaded(PlaneCoord),
    Gone,
}

#[derive(Debug, Clone, Copy)]
pub enum SmoothingMode {
    None,
    Gaussian { factor: i64 },
    BlockAverage { factor: i64 },
}

#[derive(Debug, Clone)]
pub struct RasterTile {
    pub width: i64,
    pub height: i64,
    pub tile_bytes: Vec<u8>,
    pub nan_rle_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ContourChunk {
    pub level: f64,
    pub progress: f64,
    pub vertices: Vec<(f64, f64)>,
    pub indices: Vec<(u32, u32)>,
}

/// Owns a loader handle, the current-plane cache, the per-frame
/// requirements cache, and the moment generator when active. Mirrors the
/// ownership layout spelled out for Session/Frame/RegionHandler: this
/// struct is the sole owner of pixel data; `specview-region` only ever
/// borrows it by id.
pub struct Frame {
    pub file_id: i32,
    loader: Box<dyn FileLoader>,
    shape: ImageShape,
    state: Mutex<FrameState>,
    plane: PlaneCache,
    requirements: Mutex<RequirementsCache>,
    moment_generator: Mutex<Option<Box<dyn MomentGenerator>>>,
}

fn runs_to_bytes(runs: &[u32]) -> Vec<u8> {
    runs.iter().flat_map(|r| r.to_le_bytes()).collect()
}

fn extract_rect(pixels: &[f32], width: i64, rect: Rect) -> Vec<f32> {
    let mut out = Vec::with_capacity((rect.width * rect.height) as usize);
    for y in rect.y..rect.y_max() {
        let row_start = (y * width + rect.x) as usize;
        out.extend_from_slice(&pixels[row_start..row_start + rect.width as usize]);
    }
    out
}

impl Frame {
    /// Opens an image through `loader`, discovering its axes and filling
    /// the initial plane (channel 0, stokes 0). Fails with
    /// [`Error::Open`] on unsupported dimensionality or a loader error.
    pub fn open(file_id: i32, mut loader: Box<dyn FileLoader>, hdu: &str) -> Result<Frame> {
        loader.open_file(hdu).map_err(|e| Error::Open(e.to_string()))?;
        let (shape, _z_axis, _stokes_axis) = loader
            .find_coordinate_axes()
            .map_err(|e| Error::Open(e.to_string()))?;

        let frame = Frame {
            file_id,
            loader,
            shape,
            state: Mutex::new(FrameState::Loading),
            plane: PlaneCache::new(),
            requirements: Mutex::new(RequirementsCache::new()),
            moment_generator: Mutex::new(None),
        };
        frame.load_plane(PlaneCoord::new(0, 0))?;
        Ok(frame)
    }

    fn load_plane(&self, coord: PlaneCoord) -> Result<()> {
        self.shape.validate_channel(coord.channel)?;
        self.shape.validate_stokes(coord.stokes)?;
        *self.state.lock().expect("frame state lock poisoned") = FrameState::Loading;
        let slicer = Slicer::plane(coord.channel, coord.stokes);
        let pixels = self.loader.get_slice(&slicer).map_err(|e| Error::Loader(e.to_string()))?;
        self.plane.store(coord, pixels);
        *self.state.lock().expect("frame state lock poisoned") = FrameState::Loaded(coord);
        Ok(())
    }

    /// Validates bounds, rebuilds the plane cache under the write lock,
    /// and reports whether the plane actually changed.
    pub fn set_image_channels(&self, channel: i64, stokes: i64) -> Result<bool> {
        let requested = PlaneCoord::new(channel, stokes);
        if self.plane.current_coord() == Some(requested) {
            return Ok(false);
        }
        self.load_plane(requested)?;
        Ok(true)
    }

    pub fn current_coord(&self) -> Option<PlaneCoord> {
        self.plane.current_coord()
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Downsamples the tile's bounded region of the current plane by its
    /// mip factor, NaN-encodes it, then optionally ZFP-compresses it.
    /// Returns [`Error::Stale`] if `(channel, stokes)` no longer matches
    /// the live plane — the caller is expected to silently drop the tile
    /// rather than report an error to the client.
    pub fn fill_raster_tile(
        &self,
        tile: TileCoord,
        channel: i64,
        stokes: i64,
        quality: Option<i32>,
    ) -> Result<RasterTile> {
        let coord = PlaneCoord::new(channel, stokes);
        if !self.plane.is_current(coord) {
            return Err(Error::Stale);
        }
        let mip = specview_core::tile::layer_to_mip(tile.layer, self.shape.width, self.shape.height, TILE_SIZE);
        let origin_x = tile.x as i64 * TILE_SIZE * mip;
        let origin_y = tile.y as i64 * TILE_SIZE * mip;
        let src_rect = Rect::new(origin_x, origin_y, TILE_SIZE * mip, TILE_SIZE * mip)
            .clip_to(self.shape.width, self.shape.height)
            .ok_or(Error::Stale)?;

        let sub = self
            .plane
            .with_pixels(|pixels| extract_rect(pixels, self.shape.width, src_rect))
            .ok_or(Error::Stale)?;
        if !self.plane.is_current(coord) {
            return Err(Error::Stale);
        }

        let mut downsampled = kernels::downsample(&sub, src_rect.width, src_rect.height, mip, 0, 0)?;
        let out_w = src_rect.width.div_ceil(mip);
        let out_h = src_rect.height.div_ceil(mip);

        let nan_mask = kernels::encode_rle(&mut downsampled);
        let tile_bytes = if let Some(q) = quality {
            kernels::compress_tile(&downsampled, out_w, out_h, q)?.bytes
        } else {
            downsampled.iter().flat_map(|v| v.to_le_bytes()).collect()
        };

        Ok(RasterTile {
            width: out_w,
            height: out_h,
            tile_bytes,
            nan_rle_bytes: runs_to_bytes(&nan_mask.runs),
        })
    }

    /// Traces every requested contour level, optionally pre-smoothing the
    /// plane, and feeds `on_chunk` incremental `(level, progress,
    /// vertices, indices)` updates whenever the accumulated vertex count
    /// for a level exceeds `2 * chunk_size`.
    pub fn contour_image(
        &self,
        levels: &[f64],
        smoothing: SmoothingMode,
        chunk_size: usize,
        mut on_chunk: impl FnMut(ContourChunk),
    ) -> Result<()> {
        let plane = self.plane.with_pixels(|p| p.to_vec()).ok_or(Error::Stale)?;
        let (data, width, height, vertex_offset, vertex_scale) = match smoothing {
            SmoothingMode::None => (plane, self.shape.width, self.shape.height, 0.0, 1.0),
            SmoothingMode::Gaussian { factor } => {
                let smoothed = kernels::gaussian_smooth(&plane, self.shape.width, self.shape.height, factor)?;
                (smoothed, self.shape.width, self.shape.height, (factor - 1) as f64, 1.0)
            }
            SmoothingMode::BlockAverage { factor } => {
                let reduced = kernels::downsample(&plane, self.shape.width, self.shape.height, factor, 0, 0)?;
                let w = self.shape.width.div_ceil(factor);
                let h = self.shape.height.div_ceil(factor);
                (reduced, w, h, 0.0, factor as f64)
            }
        };

        let threshold = 2 * chunk_size;
        for (level_index, contour) in kernels::trace_levels(&data, width, height, levels).into_iter().enumerate() {
            let level = levels[level_index];
            let total_segments = contour.segments.len();
            let mut flushed = 0usize;
            let mut vertices = Vec::new();
            let mut indices = Vec::new();
            for &(a, b) in &contour.segments {
                let base = vertices.len() as u32;
                let (vax, vay) = contour.vertices[a as usize];
                let (vbx, vby) = contour.vertices[b as usize];
                vertices.push((vax * vertex_scale + vertex_offset, vay * vertex_scale + vertex_offset));
                vertices.push((vbx * vertex_scale + vertex_offset, vby * vertex_scale + vertex_offset));
                indices.push((base, base + 1));
                flushed += 1;

                if vertices.len() > threshold {
                    on_chunk(ContourChunk {
                        level,
                        progress: flushed as f64 / total_segments.max(1) as f64,
                        vertices: std::mem::take(&mut vertices),
                        indices: std::mem::take(&mut indices),
                    });
                }
            }
            if !vertices.is_empty() {
                on_chunk(ContourChunk {
                    level,
                    progress: 1.0,
                    vertices,
                    indices,
                });
            }
        }
        Ok(())
    }

    /// Returns the histogram for a region, preferring (in order) a
    /// loader-cached histogram with matching `num_bins`, a frame-cached
    /// one, or a freshly computed one. For a cube region this runs the
    /// channel-wise two-pass (stats to find bounds, then histogram),
    /// checking `cancel` between channels.
    pub fn fill_region_histogram_data(
        &self,
        region_id: i32,
        region: &RegionMask,
        num_bins: usize,
        channels: &[i64],
        stokes: i64,
        cancel: &dyn Fn() -> bool,
    ) -> Result<Histogram> {
        let cache_id = CacheId {
            file_id: self.file_id,
            region_id,
            stokes,
            channel: *channels.first().unwrap_or(&0),
        };
        {
            let reqs = self.requirements.lock().expect("requirements lock poisoned");
            if let Some(h) = reqs.get_histogram(&cache_id) {
                if h.num_bins() == num_bins {
                    return Ok(h.clone());
                }
            }
        }

        // pass 1: stats across channels to establish bounds. Prefer the
        // loader's own precomputed stats over recomputing from pixels; only
        // fall back to the region scan for channels it can't supply.
        let mut merged = BasicStats::empty();
        for &channel in channels {
            if cancel() {
                return Err(Error::Cancelled);
            }
            let stats = match self.loader.get_image_stats(stokes, channel) {
                Some(loader_stats) if loader_stats.num_pixels > 0 => loader_stats,
                _ => {
                    let pixels = self.region_pixels(channel, stokes, region)?;
                    kernels::compute_basic_stats(&pixels)
                }
            };
            merged = kernels::merge_basic_stats(&merged, &stats);
        }
        if merged.num_pixels == 0 {
            return Ok(Histogram::empty());
        }

        // pass 2: accumulate the histogram itself
        let mut histogram = Histogram::empty();
        for &channel in channels {
            if cancel() {
                return Err(Error::Cancelled);
            }
            let pixels = self.region_pixels(channel, stokes, region)?;
            let partial = kernels::compute_histogram(&pixels, num_bins, merged.min, merged.max);
            histogram = if histogram.is_cleared() {
                partial
            } else {
                histogram.add(&partial)
            };
        }

        self.requirements
            .lock()
            .expect("requirements lock poisoned")
            .put_histogram(cache_id, histogram.clone());
        Ok(histogram)
    }

    /// Clears every cached product tied to `region_id`, regardless of
    /// which plane it was computed for. Called by the region handler as
    /// the first of its three region-modification post-conditions.
    pub fn clear_region_requirements(&self, region_id: i32) {
        self.requirements
            .lock()
            .expect("requirements lock poisoned")
            .clear_region(self.file_id, region_id);
    }

    /// Reads the pixels inside `region` for a given plane: from the live
    /// plane cache when it's the current one, otherwise straight from the
    /// loader. Public so collaborators (e.g. the region handler's fitter
    /// delegation) can get at raw pixels without going through a
    /// stats/histogram operation.
    pub fn region_pixels(&self, channel: i64, stokes: i64, region: &RegionMask) -> Result<Vec<f32>> {
        if channel == self.current_coord().map(|c| c.channel).unwrap_or(-1)
            && stokes == self.current_coord().map(|c| c.stokes).unwrap_or(-1)
        {
            let rect = region.bounds.clip_to(self.shape.width, self.shape.height).unwrap_or(region.bounds);
            let values = self
                .plane
                .with_pixels(|pixels| extract_rect(pixels, self.shape.width, rect))
                .ok_or(Error::Stale)?;
            Ok(filter_region(&values, rect, region))
        } else {
            let mut out = vec![0.0f32; region.bounds.area() as usize];
            self.loader
                .get_sub_image(region, &mut out)
                .map_err(|e| Error::Loader(e.to_string()))?;
            Ok(out)
        }
    }

    /// Streams a cursor spectral profile in self-timed `delta_z` blocks.
    /// The first block times itself and rescales `delta_z` towards
    /// [`TARGET_DELTA_TIME_MS`]; a partial result is flushed whenever
    /// [`TARGET_PARTIAL_CURSOR_TIME_MS`] has elapsed since the last flush.
    pub fn fill_spectral_profile_data(
        &self,
        x: i64,
        y: i64,
        stokes: i64,
        mut on_partial: impl FnMut(&[f32], f64),
        cancel: &dyn Fn() -> bool,
    ) -> Result<Vec<f32>> {
        let depth = self.shape.depth;
        let mut delta_z = depth.min(32).max(1);
        let mut z = 0i64;
        let mut profile = Vec::with_capacity(depth as usize);
        let mut timer = Timer::new();
        let mut since_flush = Timer::new();
        since_flush.start();

        while z < depth {
            if cancel() {
                return Err(Error::Cancelled);
            }
            let count = delta_z.min(depth - z);
            timer.start();
            let block = self
                .loader
                .get_cursor_spectral_data(x, y, stokes)
                .map_err(|e| Error::Loader(e.to_string()))?;
            timer.end();
            let start = (z as usize).min(block.len());
            let end = ((z + count) as usize).min(block.len());
            profile.extend_from_slice(&block[start..end]);
            z += count;

            if let Some(avg) = timer.average() {
                let avg_ms = avg.as_secs_f64() * 1000.0;
                if avg_ms > 0.0 {
                    let scale = TARGET_DELTA_TIME_MS as f64 / avg_ms;
                    delta_z = ((delta_z as f64) * scale).round().clamp(1.0, depth as f64) as i64;
                }
            }

            since_flush.end();
            if since_flush.total().as_millis() as u64 >= TARGET_PARTIAL_CURSOR_TIME_MS {
                on_partial(&profile, z as f64 / depth.max(1) as f64);
                since_flush.reset();
            }
            since_flush.start();
        }
        on_partial(&profile, 1.0);
        Ok(profile)
    }

    pub fn fill_region_stats_data(&self, region: &RegionMask, channel: i64, stokes: i64) -> Result<BasicStats> {
        let pixels = self.region_pixels(channel, stokes, region)?;
        Ok(kernels::compute_basic_stats(&pixels))
    }

    pub fn fill_spatial_profile_data(&self, x: i64, y: i64, stokes: i64) -> Result<(Vec<f32>, Vec<f32>)> {
        let coord = self.current_coord().ok_or(Error::Stale)?;
        if coord.stokes != stokes {
            return Err(Error::Stale);
        }
        let row = self
            .plane
            .with_pixels(|pixels| {
                let row_start = (y * self.shape.width) as usize;
                pixels[row_start..row_start + self.shape.width as usize].to_vec()
            })
            .ok_or(Error::Stale)?;
        let col = self
            .plane
            .with_pixels(|pixels| (0..self.shape.height).map(|yy| pixels[(yy * self.shape.width + x) as usize]).collect())
            .ok_or(Error::Stale)?;
        Ok((row, col))
    }

    /// Delegates to the active moment generator under the frame's image
    /// mutex (modeled here as the `moment_generator` lock itself).
    pub fn calculate_moments(&self, progress: &mut ProgressMonitor<'_>) -> Result<Vec<specview_core::loader::GeneratedImage>> {
        let mut guard = self.moment_generator.lock().expect("moment generator lock poisoned");
        let generator = guard.as_mut().ok_or_else(|| Error::Loader("no moment generator configured".into()))?;
        generator.create_moments(progress).map_err(Error::from)
    }

    pub fn set_moment_generator(&self, generator: Box<dyn MomentGenerator>) {
        *self.moment_generator.lock().expect("moment generator lock poisoned") = Some(generator);
    }

    pub fn state(&self) -> FrameState {
        *self.state.lock().expect("frame state lock poisoned")
    }

    pub fn close(&self) {
        *self.state.lock().expect("frame state lock poisoned") = FrameState::Gone;
    }
}

fn filter_region(values: &[f32], rect: Rect, region: &RegionMask) -> Vec<f32> {
    if region.mask.is_none() {
        return values.to_vec();
    }
    let mut out = Vec::with_capacity(values.len());
    for ly in 0..rect.height {
        for lx in 0..rect.width {
            if region.includes(lx, ly) {
                out.push(values[(ly * rect.width + lx) as usize]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use specview_core::loader::Slicer as CoreSlicer;
    use std::sync::Mutex as StdMutex;

    struct FakeLoader {
        width: i64,
        height: i64,
        pixels: Vec<f32>,
    }

    impl FileLoader for FakeLoader {
        fn open_file(&mut self, _hdu: &str) -> specview_core::Result<()> {
            Ok(())
        }

        fn find_coordinate_axes(&self) -> specview_core::Result<(ImageShape, Option<usize>, Option<usize>)> {
            Ok((
                ImageShape {
                    width: self.width,
                    height: self.height,
                    depth: 1,
                    stokes: 1,
                },
                None,
                None,
            ))
        }

        fn get_image(&self) -> specview_core::Result<Vec<f32>> {
            Ok(self.pixels.clone())
        }

        fn get_slice(&self, _slicer: &CoreSlicer) -> specview_core::Result<Vec<f32>> {
            Ok(self.pixels.clone())
        }

        fn get_sub_image(&self, region: &RegionMask, out: &mut [f32]) -> specview_core::Result<()> {
            let rect = region.bounds;
            for (i, v) in out.iter_mut().enumerate() {
                let ly = i as i64 / rect.width;
                let lx = i as i64 % rect.width;
                let y = rect.y + ly;
                let x = rect.x + lx;
                *v = self.pixels[(y * self.width + x) as usize];
            }
            Ok(())
        }

        fn get_cursor_spectral_data(&self, _x: i64, _y: i64, _stokes: i64) -> specview_core::Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn get_region_spectral_data(&self, _region: &RegionMask, _stokes: i64) -> specview_core::Result<Vec<f32>> {
            Ok(self.pixels.clone())
        }

        fn has_mip(&self, _n: i64) -> bool {
            false
        }

        fn get_image_stats(&self, _stokes: i64, _z: i64) -> Option<BasicStats> {
            None
        }
    }

    fn small_frame() -> Frame {
        let loader = FakeLoader {
            width: 4,
            height: 4,
            pixels: (0..16).map(|i| i as f32).collect(),
        };
        Frame::open(1, Box::new(loader), "0").unwrap()
    }

    #[test]
    fn open_populates_initial_plane() {
        let frame = small_frame();
        assert_eq!(frame.current_coord(), Some(PlaneCoord::new(0, 0)));
        assert!(matches!(frame.state(), FrameState::Loaded(_)));
    }

    #[test]
    fn set_image_channels_reports_no_change_when_same() {
        let frame = small_frame();
        assert!(!frame.set_image_channels(0, 0).unwrap());
    }

    #[test]
    fn set_image_channels_rejects_out_of_bounds() {
        let frame = small_frame();
        assert!(frame.set_image_channels(5, 0).is_err());
    }

    #[test]
    fn fill_raster_tile_reports_stale_after_channel_change_marker() {
        let frame = small_frame();
        let tile = TileCoord::new(0, 0, 0);
        // still current -> succeeds
        assert!(frame.fill_raster_tile(tile, 0, 0, None).is_ok());
        // a stokes index that was never loaded -> stale
        assert!(matches!(frame.fill_raster_tile(tile, 0, 1, None), Err(Error::Stale)));
    }

    #[test]
    fn region_stats_matches_region_pixels() {
        let frame = small_frame();
        let region = RegionMask::rectangular(Rect::new(0, 0, 2, 2));
        let stats = frame.fill_region_stats_data(&region, 0, 0).unwrap();
        assert_eq!(stats.num_pixels, 4);
        assert_eq!(stats.sum, (0 + 1 + 4 + 5) as f64);
    }

    #[test]
    fn spectral_profile_collects_full_depth_guard() {
        let frame = small_frame();
        let calls = StdMutex::new(0);
        let result = frame.fill_spectral_profile_data(0, 0, 0, |_p, _frac| {
            *calls.lock().unwrap() += 1;
        }, &|| false);
        assert!(result.is_ok());
    }
}
