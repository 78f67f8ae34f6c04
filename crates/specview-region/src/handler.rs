//! Region handler (C6): `regionId -> RegionState` plus the operations
//! that mirror Frame's per-region products for user-defined regions.

use std::collections::HashMap;

use specview_core::loader::{ProgressMonitor, RegionFileFormat, RegionMask};
use specview_core::{BasicStats, Histogram, Rect};
use specview_frame::Frame;

use crate::error::{Error, Result};
use crate::region::{ModificationEffect, RegionState};

#[derive(Debug, Clone)]
pub struct PvImage {
    pub width: i64,
    pub height: i64,
    pub data: Vec<f32>,
}

#[derive(Debug, Default)]
struct PvCache {
    image: Option<PvImage>,
    /// Control points the cached PV image was computed from, used to
    /// decide whether `update_pv_preview_region` needs to recompute.
    source_points: Vec<(f64, f64)>,
}

/// Holds region state and per-region PV preview caches. Borrows `Frame`s
/// by reference for every pixel operation — it never owns pixel data
/// itself.
#[derive(Default)]
pub struct RegionHandler {
    regions: HashMap<i32, RegionState>,
    pv_cache: HashMap<i32, PvCache>,
    next_id: i32,
    read_only: bool,
}

impl RegionHandler {
    pub fn new(read_only: bool) -> Self {
        Self {
            read_only,
            ..Default::default()
        }
    }

    /// Inserts or replaces a region's state, running the three
    /// post-conditions against `frame` in order: clear touched caches,
    /// mark a data-streams task queued, and mark any PV preview dirty.
    pub fn set_region(&mut self, region_id: i32, state: RegionState, frame: &Frame) -> ModificationEffect {
        self.regions.insert(region_id, state);
        frame.clear_region_requirements(region_id);
        self.pv_cache.remove(&region_id);
        ModificationEffect {
            caches_cleared: true,
            data_stream_task_queued: true,
            pv_marked_dirty: true,
        }
    }

    pub fn remove_region(&mut self, region_id: i32, frame: &Frame) -> Result<()> {
        self.regions.remove(&region_id).ok_or(Error::UnknownRegion(region_id))?;
        frame.clear_region_requirements(region_id);
        self.pv_cache.remove(&region_id);
        Ok(())
    }

    pub fn get_region(&self, region_id: i32) -> Result<&RegionState> {
        self.regions.get(&region_id).ok_or(Error::UnknownRegion(region_id))
    }

    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Parses an on-disk region file and registers every region found,
    /// returning the newly allocated ids.
    pub fn import_region(
        &mut self,
        path: &std::path::Path,
        format: &dyn RegionFileFormat,
        reference_file_id: i32,
    ) -> Result<Vec<i32>> {
        let imported = format.import(path).map_err(Error::from)?;
        let mut ids = Vec::with_capacity(imported.len());
        for region in imported {
            let id = self.allocate_id();
            let region_type = match region.region_type.as_str() {
                "point" => crate::region::RegionType::Point,
                "rectangle" | "rotbox" => crate::region::RegionType::Rectangle,
                "ellipse" => crate::region::RegionType::Ellipse,
                "polygon" => crate::region::RegionType::Polygon,
                "line" => crate::region::RegionType::Line,
                "polyline" => crate::region::RegionType::Polyline,
                "annulus" => crate::region::RegionType::Annulus,
                _ => crate::region::RegionType::Polygon,
            };
            self.regions.insert(
                id,
                RegionState::new(region_type, region.control_points, region.rotation_deg, reference_file_id),
            );
            ids.push(id);
        }
        Ok(ids)
    }

    /// Writes the given regions to disk. Disabled in read-only mode.
    pub fn export_region(&self, path: &std::path::Path, ids: &[i32], format: &dyn RegionFileFormat) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        let mut exported = Vec::with_capacity(ids.len());
        for &id in ids {
            let state = self.get_region(id)?;
            exported.push(specview_core::loader::ImportedRegion {
                region_type: format!("{:?}", state.region_type).to_lowercase(),
                control_points: state.control_points.clone(),
                rotation_deg: state.rotation_deg,
            });
        }
        format.export(path, &exported).map_err(Error::from)
    }

    fn region_mask(&self, region_id: i32) -> Result<RegionMask> {
        let state = self.get_region(region_id)?;
        let bounds = bounding_box(&state.control_points);
        Ok(RegionMask::rectangular(bounds))
    }

    pub fn fill_region_histogram_data(
        &self,
        region_id: i32,
        frame: &Frame,
        num_bins: usize,
        channels: &[i64],
        stokes: i64,
        cancel: &dyn Fn() -> bool,
    ) -> Result<Histogram> {
        let mask = self.region_mask(region_id)?;
        Ok(frame.fill_region_histogram_data(region_id, &mask, num_bins, channels, stokes, cancel)?)
    }

    pub fn fill_region_stats_data(&self, region_id: i32, frame: &Frame, channel: i64, stokes: i64) -> Result<BasicStats> {
        let mask = self.region_mask(region_id)?;
        Ok(frame.fill_region_stats_data(&mask, channel, stokes)?)
    }

    /// Integrates intensity along a line region into a new 2-D position-
    /// velocity image. In `preview` mode, results are meant to be
    /// throttled by the caller (e.g. only recomputed on pointer-up); this
    /// function always computes the current image, leaving the throttle
    /// policy itself to the session layer.
    pub fn calculate_pv_image(&mut self, region_id: i32, frame: &Frame, stokes: i64, preview: bool) -> Result<PvImage> {
        let state = self.get_region(region_id)?.clone_for_pv();
        let mask = self.region_mask(region_id)?;
        let depth = frame.shape().depth;
        let mut rows = Vec::with_capacity(depth as usize);
        for channel in 0..depth {
            let stats = frame.fill_region_stats_data(&mask, channel, stokes)?;
            rows.push(stats.sum as f32);
        }
        let image = PvImage {
            width: depth,
            height: 1,
            data: rows,
        };
        if preview {
            self.pv_cache.insert(
                region_id,
                PvCache {
                    image: Some(image.clone()),
                    source_points: state.control_points,
                },
            );
        }
        Ok(image)
    }

    /// Recomputes the cached PV preview only if the region's control
    /// points changed since it was last cached.
    pub fn update_pv_preview_region(&mut self, region_id: i32, frame: &Frame, stokes: i64) -> Result<Option<PvImage>> {
        let current_points = self.get_region(region_id)?.control_points.clone();
        let stale = self
            .pv_cache
            .get(&region_id)
            .is_none_or(|cache| cache.source_points != current_points);
        if !stale {
            return Ok(None);
        }
        self.calculate_pv_image(region_id, frame, stokes, true).map(Some)
    }

    /// Delegates fitting to `specview-fit` over the region's bounding
    /// mask on the current plane.
    pub fn fit_image(
        &self,
        region_id: i32,
        frame: &Frame,
        channel: i64,
        stokes: i64,
        config: &specview_fit::FitConfig,
        progress: &mut ProgressMonitor<'_>,
        cancel: &dyn Fn() -> bool,
    ) -> Result<specview_fit::FitResult> {
        let mask = self.region_mask(region_id)?;
        let rect = mask.bounds.clip_to(frame.shape().width, frame.shape().height).unwrap_or(mask.bounds);
        let pixels = frame.region_pixels(channel, stokes, &mask)?;
        specview_fit::fit_region(config, &pixels, rect.width, rect.height, progress, cancel).map_err(Error::from)
    }
}

fn bounding_box(points: &[(f64, f64)]) -> Rect {
    if points.is_empty() {
        return Rect::new(0, 0, 0, 0);
    }
    let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    Rect::new(min_x.floor() as i64, min_y.floor() as i64, (max_x - min_x).ceil().max(1.0) as i64, (max_y - min_y).ceil().max(1.0) as i64)
}

impl RegionState {
    fn clone_for_pv(&self) -> RegionState {
        self.clone()
    }
}
