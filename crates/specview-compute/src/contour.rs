//! Marching-squares contour tracing (C1).
//!
//! NaN corners are treated as `-∞` for the `level` comparison, so a
//! boundary between data and a NaN region always produces a contour
//! segment; the actual vertex placed at such a crossing sits at the NaN
//! corner itself (interpolation towards `-∞` is meaningless, so the
//! crossing fraction collapses to 0 or 1 instead).
//!
//! Cells are visited in four boundary sweeps (top, right, bottom, left
//! edge of the image) before the interior sweep, each cell's `visited`
//! flag guarding against being traced twice — a cell with a shared corner
//! sits in both a boundary sweep and its neighbor's interior scan.

use rayon::prelude::*;

/// One traced level's output: a flat vertex buffer and the index pairs
/// that make up its line segments.
#[derive(Debug, Clone, Default)]
pub struct Contour {
    pub vertices: Vec<(f64, f64)>,
    pub segments: Vec<(u32, u32)>,
}

#[derive(Clone, Copy)]
struct Corner {
    value: f32,
}

impl Corner {
    #[inline]
    fn effective(self) -> f64 {
        if self.value.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.value as f64
        }
    }

    #[inline]
    fn is_nan(self) -> bool {
        self.value.is_nan()
    }
}

/// Interpolation fraction along the edge from `a` to `b` at `level`. A NaN
/// endpoint collapses the crossing onto that endpoint rather than
/// interpolating towards `-∞`.
fn crossing_fraction(a: Corner, b: Corner, level: f64) -> f64 {
    if a.is_nan() {
        return 0.0;
    }
    if b.is_nan() {
        return 1.0;
    }
    let va = a.value as f64;
    let vb = b.value as f64;
    if (vb - va).abs() < f64::EPSILON {
        0.5
    } else {
        ((level - va) / (vb - va)).clamp(0.0, 1.0)
    }
}

fn trace_cell(
    data: &[f32],
    width: i64,
    height: i64,
    cx: i64,
    cy: i64,
    level: f64,
    vertices: &mut Vec<(f64, f64)>,
    segments: &mut Vec<(u32, u32)>,
) {
    let at = |x: i64, y: i64| Corner {
        value: data[(y * width + x) as usize],
    };
    let tl = at(cx, cy);
    let tr = at(cx + 1, cy);
    let br = at(cx + 1, cy + 1);
    let bl = at(cx, cy + 1);

    let below = |c: Corner| c.effective() < level;

    // edges in {top, right, bottom, left} order, each as (corner0, corner1, p0, p1)
    let edges: [(Corner, Corner, (f64, f64), (f64, f64)); 4] = [
        (tl, tr, (cx as f64, cy as f64), (cx as f64 + 1.0, cy as f64)),
        (tr, br, (cx as f64 + 1.0, cy as f64), (cx as f64 + 1.0, cy as f64 + 1.0)),
        (br, bl, (cx as f64 + 1.0, cy as f64 + 1.0), (cx as f64, cy as f64 + 1.0)),
        (bl, tl, (cx as f64, cy as f64 + 1.0), (cx as f64, cy as f64)),
    ];

    let mut crossings: Vec<(f64, f64)> = Vec::with_capacity(4);
    for (a, b, pa, pb) in edges {
        if below(a) != below(b) {
            let t = crossing_fraction(a, b, level);
            crossings.push((pa.0 + (pb.0 - pa.0) * t, pa.1 + (pb.1 - pa.1) * t));
        }
    }

    // Pair crossings into segments: the common 2-crossing case connects
    // directly; the ambiguous 4-crossing saddle case pairs them in the
    // order found (top/right with bottom/left) rather than running an
    // asymptotic decider.
    let mut push_segment = |p0: (f64, f64), p1: (f64, f64)| {
        let i0 = vertices.len() as u32;
        vertices.push(p0);
        vertices.push(p1);
        segments.push((i0, i0 + 1));
    };
    match crossings.len() {
        2 => push_segment(crossings[0], crossings[1]),
        4 => {
            push_segment(crossings[0], crossings[1]);
            push_segment(crossings[2], crossings[3]);
        }
        _ => {}
    }
}

/// Traces a single contour level across the whole plane.
pub fn trace_level(data: &[f32], width: i64, height: i64, level: f64) -> Contour {
    if width < 2 || height < 2 {
        return Contour::default();
    }
    let cells_x = width - 1;
    let cells_y = height - 1;
    let mut visited = vec![false; (cells_x * cells_y) as usize];
    let mut vertices = Vec::new();
    let mut segments = Vec::new();

    let mut visit = |cx: i64, cy: i64, visited: &mut [bool]| -> bool {
        let idx = (cy * cells_x + cx) as usize;
        if visited[idx] {
            false
        } else {
            visited[idx] = true;
            true
        }
    };

    // boundary sweeps: top row, right column, bottom row, left column
    for cx in 0..cells_x {
        if visit(cx, 0, &mut visited) {
            trace_cell(data, width, height, cx, 0, level, &mut vertices, &mut segments);
        }
    }
    for cy in 0..cells_y {
        if visit(cells_x - 1, cy, &mut visited) {
            trace_cell(data, width, height, cells_x - 1, cy, level, &mut vertices, &mut segments);
        }
    }
    for cx in (0..cells_x).rev() {
        if visit(cx, cells_y - 1, &mut visited) {
            trace_cell(data, width, height, cx, cells_y - 1, level, &mut vertices, &mut segments);
        }
    }
    for cy in (0..cells_y).rev() {
        if visit(0, cy, &mut visited) {
            trace_cell(data, width, height, 0, cy, level, &mut vertices, &mut segments);
        }
    }

    // interior sweep
    for cy in 0..cells_y {
        for cx in 0..cells_x {
            if visit(cx, cy, &mut visited) {
                trace_cell(data, width, height, cx, cy, level, &mut vertices, &mut segments);
            }
        }
    }

    Contour { vertices, segments }
}

/// Traces every requested level in parallel (OpenMP parallelizes over
/// levels in the original; rayon does the same here).
pub fn trace_levels(data: &[f32], width: i64, height: i64, levels: &[f64]) -> Vec<Contour> {
    levels
        .par_iter()
        .map(|&level| trace_level(data, width, height, level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_plane_has_no_crossings() {
        let data = vec![1.0f32; 9];
        let c = trace_level(&data, 3, 3, 0.5);
        assert!(c.segments.is_empty());
    }

    #[test]
    fn step_edge_produces_segment() {
        // left column 0.0, right column 2.0 -> level 1.0 crosses every row
        let data = vec![0.0, 2.0, 0.0, 2.0, 0.0, 2.0];
        let c = trace_level(&data, 2, 3, 1.0);
        assert!(!c.segments.is_empty());
    }

    #[test]
    fn nan_boundary_produces_contour() {
        let data = vec![1.0, 1.0, 1.0, f32::NAN, f32::NAN, f32::NAN];
        let c = trace_level(&data, 3, 2, 0.5);
        assert!(!c.segments.is_empty());
    }

    #[test]
    fn degenerate_plane_returns_empty() {
        let data = vec![1.0f32];
        let c = trace_level(&data, 1, 1, 0.5);
        assert!(c.segments.is_empty());
    }
}
