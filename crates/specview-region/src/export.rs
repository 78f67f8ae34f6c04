//! Statistics CSV export, supplemented from the original `DataExporter`
//! utility. Not part of the wire protocol — this is a convenience export
//! path for a region's per-channel stats table, the same shape
//! `fillRegionStatsData` produces one row of at a time.

use std::io::Write;

use specview_core::BasicStats;

use crate::error::{Error, Result};

/// Writes a `(channel, num_pixels, sum, mean, std_dev, min, max, rms)`
/// CSV with a header row.
pub fn export_stats_csv<W: Write>(mut writer: W, rows: &[(i64, BasicStats)]) -> Result<()> {
    writeln!(writer, "channel,num_pixels,sum,mean,std_dev,min,max,rms").map_err(|e| Error::Io(e.to_string()))?;
    for (channel, stats) in rows {
        writeln!(
            writer,
            "{channel},{},{},{},{},{},{},{}",
            stats.num_pixels, stats.sum, stats.mean, stats.std_dev, stats.min, stats.max, stats.rms
        )
        .map_err(|e| Error::Io(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_one_row_per_channel() {
        let mut buf = Vec::new();
        let rows = vec![(0i64, BasicStats::empty()), (1i64, BasicStats::empty())];
        export_stats_csv(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "channel,num_pixels,sum,mean,std_dev,min,max,rms");
        assert_eq!(lines.count(), 2);
    }
}
