//! Animation object (C8): per-frame-tick playback state machine with
//! forward/reverse/loop rules and a client flow-control window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Ticks per second the flow-control window is evaluated against;
/// chosen so a `frame_rate=5` playback gets a window of a couple of
/// frames rather than stalling on every tick (see DESIGN.md).
const WAITS_PER_SECOND: f64 = 5.0;
const WINDOW_SCALE: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct AnimationState {
    pub file_id: i32,
    pub first: i64,
    pub start: i64,
    pub last: i64,
    pub end: i64,
    pub delta: i64,
    pub current: i64,
    pub last_flow_frame: i64,
    pub frame_rate: f64,
    pub looping: bool,
    pub reverse_at_end: bool,
    pub stop_called: bool,
    pub waiting_flow_event: bool,
    pub stokes_indices: Vec<i64>,
    pub matched_frames: HashMap<i32, Vec<i64>>,
    last_tick: Option<Instant>,
}

impl AnimationState {
    pub fn new(file_id: i32, first: i64, start: i64, last: i64, end: i64, delta: i64, frame_rate: f64) -> Self {
        Self {
            file_id,
            first,
            start,
            last,
            end,
            delta,
            current: start,
            last_flow_frame: start,
            frame_rate,
            looping: false,
            reverse_at_end: false,
            stop_called: false,
            waiting_flow_event: false,
            stokes_indices: Vec::new(),
            matched_frames: HashMap::new(),
            last_tick: None,
        }
    }

    /// `CurrentFlowWindowSize = (frame_rate / waits_per_second) * window_scale`.
    pub fn flow_window_size(&self) -> i64 {
        ((self.frame_rate / WAITS_PER_SECOND) * WINDOW_SCALE).max(1.0).round() as i64
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64((1.0 / self.frame_rate.max(0.001)).max(0.0))
    }

    /// Whether enough wall-clock time has elapsed since the previous
    /// tick to advance again.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_tick {
            None => true,
            Some(t) => now.duration_since(t) >= self.frame_interval(),
        }
    }

    /// Advances playback by one tick, returning the frame to publish, or
    /// `None` if the animation should yield this tick (stopped, or
    /// parked waiting on a flow-control ack).
    pub fn advance(&mut self, now: Instant) -> Option<i64> {
        if self.stop_called || self.waiting_flow_event {
            return None;
        }
        self.last_tick = Some(now);

        let frame = self.current;

        let reached_bound = if self.delta > 0 {
            self.current >= self.end
        } else {
            self.current <= self.end
        };

        if reached_bound {
            if self.reverse_at_end {
                std::mem::swap(&mut self.start, &mut self.end);
                self.delta = -self.delta;
            } else if self.looping {
                self.current = self.start;
            } else {
                self.stop_called = true;
            }
        } else {
            self.current += self.delta;
        }

        if (self.current - self.last_flow_frame).abs() > self.flow_window_size() {
            self.waiting_flow_event = true;
        }

        Some(frame.clamp(self.first, self.last))
    }

    /// Records a client `AnimationFlowControl` ack, sliding the window
    /// and un-parking the animation if it had stalled waiting for one.
    pub fn record_flow_control(&mut self, received_frame: i64) {
        self.last_flow_frame = received_frame;
        if (self.current - self.last_flow_frame).abs() <= self.flow_window_size() {
            self.waiting_flow_event = false;
        }
    }

    pub fn stop(&mut self) {
        self.stop_called = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_playback_observes_expected_channel_sequence() {
        let mut anim = AnimationState::new(0, 0, 1, 24, 10, 1, 5.0);
        // flow-control acked every frame so the window never stalls playback
        let mut observed = Vec::new();
        let now = Instant::now();
        for _ in 0..10 {
            if let Some(frame) = anim.advance(now) {
                observed.push(frame);
                anim.record_flow_control(frame);
            }
        }
        assert_eq!(observed, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn reverse_playback_observes_descending_sequence() {
        let mut anim = AnimationState::new(0, 0, 19, 24, 10, -1, 5.0);
        let mut observed = Vec::new();
        let now = Instant::now();
        for _ in 0..10 {
            if let Some(frame) = anim.advance(now) {
                observed.push(frame);
                anim.record_flow_control(frame);
            }
        }
        assert_eq!(observed, vec![19, 18, 17, 16, 15, 14, 13, 12, 11, 10]);
    }

    #[test]
    fn looping_wraps_back_to_start() {
        let mut anim = AnimationState::new(0, 0, 1, 24, 3, 1, 5.0);
        anim.looping = true;
        let now = Instant::now();
        let mut frames = Vec::new();
        for _ in 0..6 {
            if let Some(f) = anim.advance(now) {
                frames.push(f);
                anim.record_flow_control(f);
            }
        }
        assert_eq!(frames, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn reverse_at_end_flips_direction_instead_of_stopping() {
        let mut anim = AnimationState::new(0, 0, 1, 24, 3, 1, 5.0);
        anim.reverse_at_end = true;
        let now = Instant::now();
        let mut frames = Vec::new();
        for _ in 0..5 {
            if let Some(f) = anim.advance(now) {
                frames.push(f);
                anim.record_flow_control(f);
            }
        }
        assert_eq!(frames, vec![1, 2, 3, 2, 1]);
    }

    #[test]
    fn stops_without_looping_or_reversing() {
        let mut anim = AnimationState::new(0, 0, 1, 24, 2, 1, 5.0);
        let now = Instant::now();
        let f1 = anim.advance(now).unwrap();
        anim.record_flow_control(f1);
        let f2 = anim.advance(now).unwrap();
        anim.record_flow_control(f2);
        assert_eq!((f1, f2), (1, 2));
        assert!(anim.stop_called);
        assert!(anim.advance(now).is_none());
    }

    #[test]
    fn no_flow_control_acks_parks_after_window_exceeded() {
        let mut anim = AnimationState::new(0, 0, 1, 24, 20, 1, 5.0);
        let now = Instant::now();
        let window = anim.flow_window_size();
        let mut ticks = 0;
        while anim.advance(now).is_some() {
            ticks += 1;
            if ticks > 1000 {
                panic!("animation never parked");
            }
        }
        assert!(ticks as i64 <= window + 1);
        assert!(anim.waiting_flow_event);
    }
}
