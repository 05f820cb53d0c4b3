//! # Frame Pacing
//!
//! Self-paced frame timing for the combined update/render thread. There is
//! no vsync thread; the loop sleeps until the next frame boundary instead.
//!
//! ```text
//!   frame start          boundary            boundary            boundary
//!   │◄──── duration ────►│◄──── duration ────►│◄──── duration ────►│
//!   │  update + render ───────►│ (late, no sleep, nothing dropped)  │
//!   │  update + render ─────────────────────────►│ (over a frame late)
//!                                              sleep until ────────┘
//!                                              extra_frames_dropped = 1
//! ```
//!
//! A frame that ends slightly past its boundary starts the next one at
//! once. Frames are only dropped when the thread is more than one whole
//! frame behind.

/// Frame length at 60 Hz in seconds.
pub const DEFAULT_FRAME_DURATION_SECONDS: f32 = 1.0 / 60.0;

/// Frame length at 60 Hz in milliseconds.
pub const DEFAULT_FRAME_DURATION_MILLISECONDS: u64 = 1_000 / 60;

/// Frame length at 60 Hz in nanoseconds.
pub const DEFAULT_FRAME_DURATION_NANOSECONDS: u64 = 1_000_000_000 / 60;

/// Frame lengths for a given refresh rate (vsyncs per rendered frame).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameDuration {
    /// Seconds advanced by one frame.
    pub delta_seconds: f32,
    /// Frame length in milliseconds.
    pub milliseconds: u64,
    /// Frame length in nanoseconds.
    pub nanoseconds: u64,
}

impl Default for FrameDuration {
    fn default() -> Self {
        Self::from_refresh_rate(1)
    }
}

impl FrameDuration {
    /// Frame lengths when one frame is rendered every `refresh_rate` vsyncs.
    ///
    /// A rate of zero is treated as one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_refresh_rate(refresh_rate: u32) -> Self {
        let rate = refresh_rate.max(1);
        Self {
            delta_seconds: DEFAULT_FRAME_DURATION_SECONDS * rate as f32,
            milliseconds: DEFAULT_FRAME_DURATION_MILLISECONDS * u64::from(rate),
            nanoseconds: DEFAULT_FRAME_DURATION_NANOSECONDS * u64::from(rate),
        }
    }

}

/// Tracks the next frame boundary and how many frames were dropped.
#[derive(Clone, Debug, Default)]
pub struct FramePacer {
    duration: FrameDuration,
    time_to_sleep_until: u64,
    extra_frames_dropped: u64,
}

impl FramePacer {
    /// Creates a pacer for the given frame duration.
    #[must_use]
    pub fn new(duration: FrameDuration) -> Self {
        Self {
            duration,
            time_to_sleep_until: 0,
            extra_frames_dropped: 0,
        }
    }

    /// Changes the frame duration. Takes effect at the next boundary.
    pub fn set_duration(&mut self, duration: FrameDuration) {
        self.duration = duration;
    }

    /// The active frame duration.
    #[must_use]
    pub const fn duration(&self) -> FrameDuration {
        self.duration
    }

    /// Forgets the schedule. Call after the thread has been waiting.
    pub fn reset(&mut self) {
        self.time_to_sleep_until = 0;
    }

    /// Whole frames skipped at the last boundary.
    #[must_use]
    pub const fn extra_frames_dropped(&self) -> u64 {
        self.extra_frames_dropped
    }

    /// Seconds the next update should advance the scene by.
    ///
    /// Zero when elapsed time is not used (the first frame after a wait),
    /// otherwise one frame plus every frame dropped at the last boundary.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn frame_delta(&self, use_elapsed_time: bool) -> f32 {
        if use_elapsed_time {
            self.duration.delta_seconds * (self.extra_frames_dropped + 1) as f32
        } else {
            0.0
        }
    }

    /// Computes the boundary to sleep until after a frame.
    ///
    /// `frame_start_ns` is when the frame began, `now_ns` is after rendering.
    /// When the frame ended more than one frame past the schedule, the
    /// boundaries it cannot catch up with are skipped and counted as dropped.
    pub fn end_frame(&mut self, frame_start_ns: u64, now_ns: u64) -> u64 {
        let step = self.duration.nanoseconds;
        if self.time_to_sleep_until == 0 {
            self.time_to_sleep_until = frame_start_ns + step;
            self.extra_frames_dropped = 0;
        } else {
            self.time_to_sleep_until += step;
            self.extra_frames_dropped = 0;
            while now_ns > self.time_to_sleep_until + step {
                self.time_to_sleep_until += step;
                self.extra_frames_dropped += 1;
            }
        }
        self.time_to_sleep_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_rate_scaling() {
        let one = FrameDuration::from_refresh_rate(1);
        let two = FrameDuration::from_refresh_rate(2);
        assert_eq!(two.nanoseconds, one.nanoseconds * 2);
        assert_eq!(two.milliseconds, 32);
        assert!((two.delta_seconds - 2.0 / 60.0).abs() < 1e-6);
        assert_eq!(FrameDuration::from_refresh_rate(0), one);
    }

    #[test]
    fn test_on_time_frames() {
        let mut pacer = FramePacer::new(FrameDuration::default());
        let step = DEFAULT_FRAME_DURATION_NANOSECONDS;

        let first = pacer.end_frame(1_000, 2_000);
        assert_eq!(first, 1_000 + step);

        let second = pacer.end_frame(first, first + 10);
        assert_eq!(second, 1_000 + 2 * step);
        assert_eq!(pacer.extra_frames_dropped(), 0);
        assert!((pacer.frame_delta(true) - DEFAULT_FRAME_DURATION_SECONDS).abs() < 1e-6);
    }

    #[test]
    fn test_dropped_frames_catch_up() {
        let mut pacer = FramePacer::new(FrameDuration::default());
        let step = DEFAULT_FRAME_DURATION_NANOSECONDS;

        let first = pacer.end_frame(0, 10);
        // Second frame overruns by two and a half frames
        let target = pacer.end_frame(first, first + step * 5 / 2);
        assert_eq!(pacer.extra_frames_dropped(), 1);
        assert_eq!(target, step * 3);
        assert!((pacer.frame_delta(true) - 2.0 * DEFAULT_FRAME_DURATION_SECONDS).abs() < 1e-6);
    }

    #[test]
    fn test_slight_overrun_drops_nothing() {
        let mut pacer = FramePacer::new(FrameDuration::default());
        let step = DEFAULT_FRAME_DURATION_NANOSECONDS;

        let first = pacer.end_frame(0, 10);
        // Ends one microsecond past its boundary: the next frame starts at once
        let target = pacer.end_frame(first, 2 * step + 1_000);
        assert_eq!(pacer.extra_frames_dropped(), 0);
        assert_eq!(target, 2 * step);
        assert!((pacer.frame_delta(true) - DEFAULT_FRAME_DURATION_SECONDS).abs() < 1e-6);

        // Exactly one frame behind is still not a drop
        let target = pacer.end_frame(target, 4 * step);
        assert_eq!(pacer.extra_frames_dropped(), 0);
        assert_eq!(target, 3 * step);
    }

    #[test]
    fn test_reset_and_no_elapsed_time() {
        let mut pacer = FramePacer::new(FrameDuration::default());
        pacer.end_frame(0, 10);
        pacer.reset();
        assert_eq!(pacer.end_frame(500, 600), 500 + DEFAULT_FRAME_DURATION_NANOSECONDS);
        assert!(pacer.frame_delta(false).abs() < f32::EPSILON);
    }
}
