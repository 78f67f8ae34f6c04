//! The per-frame current-plane cache.
//!
//! Readers (tile fills, histograms, profiles) take a shared read lock;
//! `setImageChannels` takes the exclusive write lock just long enough to
//! swap in the newly loaded plane: a single `RwLock`-guarded resident
//! plane rather than an LRU of many.

use std::sync::RwLock;

use specview_core::PlaneCoord;

#[derive(Debug, Clone)]
pub struct PlaneData {
    pub coord: PlaneCoord,
    pub pixels: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct PlaneCache {
    inner: RwLock<Option<PlaneData>>,
}

impl PlaneCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Replaces the resident plane under an exclusive lock.
    pub fn store(&self, coord: PlaneCoord, pixels: Vec<f32>) {
        let mut guard = self.inner.write().expect("plane cache lock poisoned");
        *guard = Some(PlaneData { coord, pixels });
    }

    /// Returns `true` if the resident plane's coordinate still matches
    /// `coord` (used by long-running fills to detect staleness after a
    /// channel change raced them).
    pub fn is_current(&self, coord: PlaneCoord) -> bool {
        self.inner
            .read()
            .expect("plane cache lock poisoned")
            .as_ref()
            .is_some_and(|p| p.coord == coord)
    }

    /// Runs `f` over the resident plane's pixels under a shared read lock,
    /// returning `None` if nothing is loaded yet.
    pub fn with_pixels<R>(&self, f: impl FnOnce(&[f32]) -> R) -> Option<R> {
        let guard = self.inner.read().expect("plane cache lock poisoned");
        guard.as_ref().map(|p| f(&p.pixels))
    }

    pub fn current_coord(&self) -> Option<PlaneCoord> {
        self.inner
            .read()
            .expect("plane cache lock poisoned")
            .as_ref()
            .map(|p| p.coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_reports_not_current() {
        let cache = PlaneCache::new();
        assert!(!cache.is_current(PlaneCoord::new(0, 0)));
        assert!(cache.with_pixels(|p| p.len()).is_none());
    }

    #[test]
    fn store_then_read() {
        let cache = PlaneCache::new();
        cache.store(PlaneCoord::new(1, 0), vec![1.0, 2.0, 3.0]);
        assert!(cache.is_current(PlaneCoord::new(1, 0)));
        assert!(!cache.is_current(PlaneCoord::new(2, 0)));
        assert_eq!(cache.with_pixels(|p| p.len()), Some(3));
    }
}
