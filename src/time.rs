//! Frame timing.
//!
//! [`Time`] measures wall-clock frame intervals and hands the simulator a
//! delta clamped to `max_delta`, so a stalled frame (window drag, debugger,
//! tab switch) never turns into one huge integration step.
//!
//! # Example
//!
//! ```ignore
//! use quicksilver::time::Time;
//!
//! let mut time = Time::new(0.033);
//!
//! // Once per frame:
//! let dt = time.update();
//! simulator.step(dt, &inputs);
//! ```

use std::time::{Duration, Instant};

/// Clamped frame clock.
#[derive(Debug)]
pub struct Time {
    last_frame: Instant,
    /// Upper bound for a single step, in seconds.
    max_delta: f32,
    /// Simulated seconds, the sum of every clamped delta.
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
}

impl Time {
    pub fn new(max_delta: f32) -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            max_delta,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
        }
    }

    /// Measure the interval since the previous call and return the step delta.
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.tick(raw)
    }

    /// Advance by a raw interval of `raw` seconds; returns the clamped delta.
    ///
    /// While paused the delta is zero and elapsed time stands still.
    pub fn tick(&mut self, raw: f32) -> f32 {
        self.frame_count += 1;
        self.delta_secs = if self.paused {
            0.0
        } else {
            raw.clamp(0.0, self.max_delta)
        };
        self.elapsed_secs += self.delta_secs;
        self.delta_secs
    }

    /// Simulated time in seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Delta returned by the last update.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Total frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Toggle pause; returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }
}
