//! Fixed timestep accounting.
//!
//! The host decides when a tick happens; [FixedTimestep] only turns the wall-clock time between
//! ticks into a whole number of constant-size simulation frames.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    frame: Duration,
    /// Elapsed time between two ticks is clamped to this, so a stall costs at most a few frames
    max_elapsed: Duration,
    accumulator: Duration,
    last: Option<Instant>,
}

impl FixedTimestep {
    pub fn new(frame: Duration, max_skip_frames: u32) -> Self {
        Self {
            frame,
            max_elapsed: frame * max_skip_frames.max(1),
            accumulator: Duration::ZERO,
            last: None,
        }
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Records the reference timestamp and drops any leftover time from a previous run
    pub fn start(&mut self, now: Instant) {
        self.last = Some(now);
        self.accumulator = Duration::ZERO;
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.accumulator = Duration::ZERO;
    }

    /// Accounts for the time since the previous call and returns how many frames to simulate.
    /// Returns 0 if [FixedTimestep::start] has not been called or the frame length is zero.
    pub fn advance(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last else {
            return 0;
        };

        self.last = Some(now);
        if self.frame.is_zero() {
            return 0;
        }

        let elapsed = now.saturating_duration_since(last).min(self.max_elapsed);
        self.accumulator += elapsed;

        let mut frames = 0;
        while self.accumulator >= self.frame {
            self.accumulator -= self.frame;
            frames += 1;
        }
        frames
    }

    /// Fraction of a frame left in the accumulator, for interpolating the render step
    pub fn alpha(&self) -> f32 {
        if self.frame.is_zero() {
            return 0.0;
        }
        self.accumulator.as_secs_f32() / self.frame.as_secs_f32()
    }
}
