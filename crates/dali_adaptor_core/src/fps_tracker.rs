//! Frames-per-second tracking for the combined update/render thread.

/// Accumulates frame times and logs the frame rate every tracking period.
#[derive(Clone, Debug)]
pub struct FpsTracker {
    tracking_seconds: f32,
    elapsed_seconds: f32,
    frame_count: u32,
    last_fps: Option<f32>,
}

impl FpsTracker {
    /// Creates a tracker reporting every `tracking_seconds`. Zero disables it.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(tracking_seconds: u32) -> Self {
        Self {
            tracking_seconds: tracking_seconds as f32,
            elapsed_seconds: 0.0,
            frame_count: 0,
            last_fps: None,
        }
    }

    /// Returns true if tracking is switched on.
    #[inline]
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.tracking_seconds > 0.0
    }

    /// Records a frame that took `seconds_since_last_frame`.
    #[allow(clippy::cast_precision_loss)]
    pub fn track(&mut self, seconds_since_last_frame: f32) {
        if !self.enabled() {
            return;
        }

        self.frame_count += 1;
        self.elapsed_seconds += seconds_since_last_frame;

        if self.elapsed_seconds >= self.tracking_seconds {
            let fps = self.frame_count as f32 / self.elapsed_seconds;
            tracing::info!("FPS: {:.2} ({} frames in {:.2}s)", fps, self.frame_count, self.elapsed_seconds);
            self.last_fps = Some(fps);
            self.frame_count = 0;
            self.elapsed_seconds = 0.0;
        }
    }

    /// Records a frame of the update/render loop.
    ///
    /// Frames that follow a wait (`use_elapsed_time` false) are skipped, so
    /// time spent paused or asleep never counts as frame time.
    #[allow(clippy::cast_precision_loss)]
    pub fn track_frame(&mut self, use_elapsed_time: bool, nanoseconds_since_last_frame: u64) {
        if use_elapsed_time && self.enabled() {
            self.track(nanoseconds_since_last_frame as f32 / 1_000_000_000.0);
        }
    }

    /// The frame rate computed at the end of the last completed period.
    #[must_use]
    pub const fn last_fps(&self) -> Option<f32> {
        self.last_fps
    }
}
