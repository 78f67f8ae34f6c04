//! Cursor-setting debouncer (C12): collapses rapid `SetCursor` updates
//! per file down to the single latest position.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorPoint {
    pub x: f64,
    pub y: f64,
    pub request_id: u32,
}

/// One `(point, request_id)` slot per file, updated in place.
#[derive(Default)]
pub struct CursorDebouncer {
    slots: Mutex<HashMap<i32, CursorPoint>>,
}

impl CursorDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the slot for `file_id`. Returns the previous
    /// `request_id` that was in flight, if any, so the caller can tell
    /// whether an in-progress spatial/spectral profile task for that
    /// request is now superseded.
    pub fn set(&self, file_id: i32, point: CursorPoint) -> Option<u32> {
        let mut slots = self.slots.lock().expect("cursor debouncer lock poisoned");
        slots.insert(file_id, point).map(|prev| prev.request_id)
    }

    /// The latest cursor for `file_id`, if one has been set.
    pub fn latest(&self, file_id: i32) -> Option<CursorPoint> {
        self.slots.lock().expect("cursor debouncer lock poisoned").get(&file_id).copied()
    }

    /// Whether `request_id` is still the latest request for `file_id` —
    /// callers use this right before publishing a profile result so a
    /// stale in-flight task never overwrites a newer one's output.
    pub fn is_current(&self, file_id: i32, request_id: u32) -> bool {
        self.latest(file_id).is_some_and(|p| p.request_id == request_id)
    }

    pub fn clear(&self, file_id: i32) {
        self.slots.lock().expect("cursor debouncer lock poisoned").remove(&file_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_final_position_survives_rapid_updates() {
        let debouncer = CursorDebouncer::new();
        for i in 0..20 {
            debouncer.set(0, CursorPoint { x: i as f64, y: i as f64, request_id: i });
        }
        let latest = debouncer.latest(0).unwrap();
        assert_eq!(latest.request_id, 19);
    }

    #[test]
    fn stale_request_is_not_current() {
        let debouncer = CursorDebouncer::new();
        debouncer.set(0, CursorPoint { x: 0.0, y: 0.0, request_id: 1 });
        debouncer.set(0, CursorPoint { x: 1.0, y: 1.0, request_id: 2 });
        assert!(!debouncer.is_current(0, 1));
        assert!(debouncer.is_current(0, 2));
    }

    #[test]
    fn separate_files_do_not_interfere() {
        let debouncer = CursorDebouncer::new();
        debouncer.set(0, CursorPoint { x: 1.0, y: 1.0, request_id: 1 });
        debouncer.set(1, CursorPoint { x: 2.0, y: 2.0, request_id: 1 });
        assert_eq!(debouncer.latest(0).unwrap().x, 1.0);
        assert_eq!(debouncer.latest(1).unwrap().x, 2.0);
    }
}
