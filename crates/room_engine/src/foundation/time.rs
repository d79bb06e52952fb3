//! Time management utilities

use std::time::Instant;

/// High-precision timer for frame timing
pub struct FrameTimer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Accumulating interval timer driven by frame deltas
///
/// The interval can change between ticks; overshoot carries into the next interval
/// so long frames do not drift the schedule.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    elapsed: f32,
    interval: f32,
}

impl IntervalTimer {
    /// Create a timer that first fires after `interval` seconds
    pub fn new(interval: f32) -> Self {
        Self { elapsed: 0.0, interval }
    }

    /// Advance by `delta_time`; returns true when the interval elapsed
    pub fn tick(&mut self, delta_time: f32) -> bool {
        self.elapsed += delta_time;
        if self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            true
        } else {
            false
        }
    }

    /// Current interval in seconds
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Change the interval used for the next tick
    pub fn set_interval(&mut self, interval: f32) {
        self.interval = interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interval_timer_carries_overshoot() {
        let mut timer = IntervalTimer::new(3.0);
        assert!(!timer.tick(2.0));
        assert!(timer.tick(1.5));
        assert_relative_eq!(timer.elapsed, 0.5);

        timer.set_interval(4.0);
        assert!(!timer.tick(3.0));
        assert!(timer.tick(0.5));
    }

    #[test]
    fn test_frame_timer_counts_frames() {
        let mut timer = FrameTimer::new();
        timer.update();
        timer.update();
        assert_eq!(timer.frame_count(), 2);
        assert!(timer.total_time() >= timer.delta_time());
    }
}
