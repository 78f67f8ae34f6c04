//! Region state and the three post-conditions a modification triggers:
//! clear touched requirement caches, queue a region-data-streams task,
//! and mark any dependent PV preview dirty.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionType {
    Point,
    Rectangle,
    Ellipse,
    Polygon,
    Line,
    Polyline,
    Annulus,
}

/// A region definition in the coordinate system of its reference file.
/// Shape mirrors the external `ImportedRegion` contract so import/export
/// round-trips without a translation layer.
#[derive(Debug, Clone)]
pub struct RegionState {
    pub region_type: RegionType,
    pub control_points: Vec<(f64, f64)>,
    pub rotation_deg: f64,
    pub reference_file_id: i32,
}

impl RegionState {
    pub fn new(region_type: RegionType, control_points: Vec<(f64, f64)>, rotation_deg: f64, reference_file_id: i32) -> Self {
        Self {
            region_type,
            control_points,
            rotation_deg,
            reference_file_id,
        }
    }
}

/// What a region modification caused; a thin record the caller can use to
/// decide whether to actually fan out the task/PV work (tests assert on
/// this instead of observing side effects indirectly).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModificationEffect {
    pub caches_cleared: bool,
    pub data_stream_task_queued: bool,
    pub pv_marked_dirty: bool,
}
