//! File-info / HDU builder (C11): assembles the header and computed
//! entries an `OpenFileAck` carries, from loader-discovered metadata.

use specview_core::loader::CoordinateSystem;
use specview_core::ImageShape;

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// The "computed entries" a client displays alongside the raw header:
/// shape, per-axis coordinate type, beam, and units, derived rather than
/// copied verbatim from the loader's header cards.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub file_id: i32,
    pub hdu: String,
    pub shape: ImageShape,
    pub header: Vec<HeaderEntry>,
    pub computed_entries: Vec<HeaderEntry>,
}

fn entry(name: &str, value: impl std::fmt::Display) -> HeaderEntry {
    HeaderEntry {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Builds a [`FileInfo`] from a shape and coordinate system, plus the
/// loader's raw header cards (copied through unchanged).
pub fn build_file_info(
    file_id: i32,
    hdu: &str,
    shape: ImageShape,
    coords: &dyn CoordinateSystem,
    raw_header: &[(String, String)],
    beam_major_arcsec: Option<f64>,
    beam_minor_arcsec: Option<f64>,
    beam_pa_deg: Option<f64>,
) -> FileInfo {
    let header = raw_header.iter().map(|(k, v)| entry(k, v)).collect();

    let mut computed = vec![
        entry("Shape", format!("{}x{}", shape.width, shape.height)),
        entry("Number of channels", shape.depth),
        entry("Number of Stokes", shape.stokes),
        entry("Projection", coords.projection()),
    ];
    for axis in 0..4 {
        computed.push(entry(
            &format!("Coordinate type ({axis})"),
            coords.axis_type(axis),
        ));
    }
    if let Some(equinox) = coords.equinox() {
        computed.push(entry("Equinox", equinox));
    }
    if let Some(radesys) = coords.radesys() {
        computed.push(entry("RA/Dec reference system", radesys));
    }
    if let (Some(major), Some(minor)) = (beam_major_arcsec, beam_minor_arcsec) {
        computed.push(entry("Restoring beam major axis", format!("{major:.4} arcsec")));
        computed.push(entry("Restoring beam minor axis", format!("{minor:.4} arcsec")));
        if let Some(pa) = beam_pa_deg {
            computed.push(entry("Restoring beam position angle", format!("{pa:.4} deg")));
        }
    }

    FileInfo {
        file_id,
        hdu: hdu.to_string(),
        shape,
        header,
        computed_entries: computed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCoords;
    impl CoordinateSystem for FakeCoords {
        fn axis_type(&self, axis: usize) -> String {
            ["RA", "DEC", "FREQ", "STOKES"][axis.min(3)].to_string()
        }
        fn projection(&self) -> String {
            "SIN".to_string()
        }
        fn reference_pixel(&self, _axis: usize) -> f64 {
            0.0
        }
        fn reference_value(&self, _axis: usize) -> f64 {
            0.0
        }
        fn increment(&self, _axis: usize) -> f64 {
            1.0
        }
        fn equinox(&self) -> Option<f64> {
            Some(2000.0)
        }
        fn radesys(&self) -> Option<String> {
            Some("ICRS".to_string())
        }
    }

    #[test]
    fn computed_entries_include_shape_and_beam() {
        let shape = ImageShape {
            width: 640,
            height: 800,
            depth: 25,
            stokes: 1,
        };
        let info = build_file_info(0, "0", shape, &FakeCoords, &[], Some(1.2), Some(0.8), Some(45.0));
        assert!(info.computed_entries.iter().any(|e| e.name == "Shape" && e.value == "640x800"));
        assert!(info.computed_entries.iter().any(|e| e.name.contains("beam major")));
    }

    #[test]
    fn beam_entries_absent_when_no_beam_reported() {
        let shape = ImageShape {
            width: 10,
            height: 10,
            depth: 1,
            stokes: 1,
        };
        let info = build_file_info(0, "0", shape, &FakeCoords, &[], None, None, None);
        assert!(!info.computed_entries.iter().any(|e| e.name.contains("beam")));
    }
}
