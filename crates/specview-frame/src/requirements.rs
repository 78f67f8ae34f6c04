//! Requirements cache (C5): composite keys over computed products plus
//! the per-region config lists that describe what's currently wanted.

use std::collections::HashMap;

use specview_core::{BasicStats, Histogram};

/// A statistic kind a client can request per-channel (spectral profile)
/// or once (region stats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Mean,
    Min,
    Max,
    Sum,
    RmsSq,
    NumPixels,
}

/// Keys the per-region *config list* (what was requested), independent of
/// which plane is currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigId {
    pub file_id: i32,
    pub region_id: i32,
}

/// Keys a *computed product*, tied to the exact plane it was computed
/// for; invalidated whenever the channel or stokes index changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheId {
    pub file_id: i32,
    pub region_id: i32,
    pub stokes: i64,
    pub channel: i64,
}

#[derive(Debug, Default)]
pub struct RequirementsCache {
    configs: HashMap<ConfigId, Vec<StatKind>>,
    histograms: HashMap<CacheId, Histogram>,
    spectral: HashMap<CacheId, HashMap<StatKind, Vec<f64>>>,
    stats: HashMap<CacheId, HashMap<StatKind, BasicStats>>,
}

impl RequirementsCache {
    pub fn new() -> Self {
        Self::default()
    }

    // --- computed product storage ---

    pub fn put_histogram(&mut self, id: CacheId, histogram: Histogram) {
        self.histograms.insert(id, histogram);
    }

    pub fn get_histogram(&self, id: &CacheId) -> Option<&Histogram> {
        self.histograms.get(id)
    }

    pub fn put_spectral(&mut self, id: CacheId, kind: StatKind, values: Vec<f64>) {
        self.spectral.entry(id).or_default().insert(kind, values);
    }

    pub fn get_spectral(&self, id: &CacheId, kind: StatKind) -> Option<&Vec<f64>> {
        self.spectral.get(id).and_then(|m| m.get(&kind))
    }

    pub fn put_stats(&mut self, id: CacheId, kind: StatKind, stats: BasicStats) {
        self.stats.entry(id).or_default().insert(kind, stats);
    }

    pub fn get_stats(&self, id: &CacheId, kind: StatKind) -> Option<&BasicStats> {
        self.stats.get(id).and_then(|m| m.get(&kind))
    }

    // --- invalidation ---

    /// Clears every computed product whose key belongs to this
    /// `(file, region)`, regardless of which channel/stokes it was
    /// computed for. Called on a region-state change (move, resize,
    /// delete).
    pub fn clear_region(&mut self, file_id: i32, region_id: i32) {
        self.clear_histograms_for_region(file_id, region_id);
        self.clear_stats_for_region(file_id, region_id);
        self.clear_profiles_for_region(file_id, region_id);
    }

    pub fn clear_histograms_for_region(&mut self, file_id: i32, region_id: i32) {
        self.histograms
            .retain(|id, _| !(id.file_id == file_id && id.region_id == region_id));
    }

    pub fn clear_stats_for_region(&mut self, file_id: i32, region_id: i32) {
        self.stats
            .retain(|id, _| !(id.file_id == file_id && id.region_id == region_id));
    }

    pub fn clear_profiles_for_region(&mut self, file_id: i32, region_id: i32) {
        self.spectral
            .retain(|id, _| !(id.file_id == file_id && id.region_id == region_id));
    }

    /// Invalidates only the exact `CacheId` tied to a plane that just
    /// stopped being live (a channel/stokes change). Config lists survive
    /// this — the client is still asking for the same stats, just on a
    /// new plane.
    pub fn invalidate_plane(&mut self, id: &CacheId) {
        self.histograms.remove(id);
        self.stats.remove(id);
        self.spectral.remove(id);
    }

    // --- config diffing ---

    /// Diffs `requested` against the live config list for `id`, returning
    /// only the newly requested stats (so only those need to be computed
    /// this pass), and updates the live set to `requested`.
    pub fn diff_new_stats(&mut self, id: ConfigId, requested: &[StatKind]) -> Vec<StatKind> {
        let live = self.configs.entry(id).or_default();
        let fresh: Vec<StatKind> = requested.iter().copied().filter(|k| !live.contains(k)).collect();
        *live = requested.to_vec();
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_id() -> CacheId {
        CacheId {
            file_id: 1,
            region_id: 2,
            stokes: 0,
            channel: 5,
        }
    }

    #[test]
    fn region_change_clears_all_buckets_for_region() {
        let mut cache = RequirementsCache::new();
        cache.put_histogram(cache_id(), Histogram::empty());
        cache.put_stats(cache_id(), StatKind::Mean, BasicStats::empty());
        cache.clear_region(1, 2);
        assert!(cache.get_histogram(&cache_id()).is_none());
        assert!(cache.get_stats(&cache_id(), StatKind::Mean).is_none());
    }

    #[test]
    fn channel_change_only_invalidates_cache_id_not_config() {
        let mut cache = RequirementsCache::new();
        let config = ConfigId {
            file_id: 1,
            region_id: 2,
        };
        cache.diff_new_stats(config, &[StatKind::Mean]);
        cache.put_stats(cache_id(), StatKind::Mean, BasicStats::empty());
        cache.invalidate_plane(&cache_id());
        assert!(cache.get_stats(&cache_id(), StatKind::Mean).is_none());
        // asking again for Mean on a config list that already has it yields nothing new
        let fresh = cache.diff_new_stats(config, &[StatKind::Mean]);
        assert!(fresh.is_empty());
    }

    #[test]
    fn diff_new_stats_reports_only_additions() {
        let mut cache = RequirementsCache::new();
        let config = ConfigId {
            file_id: 1,
            region_id: 2,
        };
        let first = cache.diff_new_stats(config, &[StatKind::Mean, StatKind::Max]);
        assert_eq!(first.len(), 2);
        let second = cache.diff_new_stats(config, &[StatKind::Mean, StatKind::Max, StatKind::Min]);
        assert_eq!(second, vec![StatKind::Min]);
    }
}
