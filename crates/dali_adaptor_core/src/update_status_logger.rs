//! Periodic logging of why the core keeps requesting updates.

use crate::interfaces::UpdateStatus;

/// Logs the keep-updating reasons every `frequency` frames.
#[derive(Clone, Debug)]
pub struct UpdateStatusLogger {
    frequency: u32,
    frame_count: u32,
}

impl UpdateStatusLogger {
    /// Creates a logger firing every `frequency` frames. Zero disables it.
    #[must_use]
    pub const fn new(frequency: u32) -> Self {
        Self {
            frequency,
            frame_count: 0,
        }
    }

    /// Counts one frame and returns the logged line if this frame was due.
    pub fn log(&mut self, keep_updating: u32) -> Option<String> {
        if self.frequency == 0 {
            return None;
        }

        self.frame_count += 1;
        if self.frame_count < self.frequency {
            return None;
        }
        self.frame_count = 0;

        let line = Self::describe(keep_updating);
        tracing::info!("{}", line);
        Some(line)
    }

    fn describe(keep_updating: u32) -> String {
        let mut line = String::from("UpdateStatusLogging keepUpdating: ");
        line.push_str(if keep_updating == 0 { "false" } else { "true" });

        if keep_updating != 0 {
            line.push(':');
            let reasons = [
                (UpdateStatus::KEEP_UPDATING_STAGE, " <Stage::KeepRendering() used>"),
                (UpdateStatus::KEEP_UPDATING_ANIMATIONS, " <Animations running>"),
                (UpdateStatus::KEEP_UPDATING_MONITORING, " <Monitoring performance>"),
                (UpdateStatus::KEEP_UPDATING_RENDER_TASK_SYNC, " <Render task waiting for completion>"),
            ];
            for (bit, reason) in reasons {
                if keep_updating & bit != 0 {
                    line.push_str(reason);
                }
            }
        }
        line
    }
}
