//! # Render Data Double Buffer
//!
//! Two copies of the same record:
//!
//! ```text
//!   EVENT THREAD                          RENDER THREAD
//!   ┌─────────────┐   transfer_into()     ┌─────────────┐
//!   │ new values  │ ───────────────────►  │   current   │
//!   │ (staging)   │   under the sync lock │  (private)  │
//!   └─────────────┘                       └─────────────┘
//! ```
//!
//! The event thread writes only the staging copy, and only while holding the
//! lock. The render thread never reads the staging copy except through
//! [`RenderData::transfer_into`], executed under that same lock.
//!
//! On the render side `replace_surface` means the surface was swapped during
//! the current iteration; on the staging side it means a swap is pending.

use std::sync::{Arc, Weak};

use crate::interfaces::{RenderSurface, SyncMode};
use crate::request::{RenderRequest, ReplaceSurfaceRequest};

/// One side of the render data double buffer.
#[derive(Clone, Debug, Default)]
pub struct RenderData {
    /// Staging: a replacement is pending. Current: the surface changed this frame.
    pub replace_surface: bool,
    /// Refresh synchronisation mode.
    pub sync_mode: SyncMode,
    /// Staging: the surface to switch to. Current: the surface being drawn to.
    pub surface: Option<Weak<dyn RenderSurface>>,
}

/// What a transfer delivered to the render thread.
#[derive(Debug, Default)]
pub struct Transfer {
    /// The sync mode differs from the one previously current.
    pub sync_mode_changed: bool,
    /// A staged surface replacement, converted into a request.
    pub request: Option<RenderRequest>,
}

impl RenderData {
    /// Render-side data drawing into `surface`.
    #[must_use]
    pub fn with_surface(surface: &Arc<dyn RenderSurface>, sync_mode: SyncMode) -> Self {
        Self {
            replace_surface: false,
            sync_mode,
            surface: Some(Arc::downgrade(surface)),
        }
    }

    /// The surface, if it still exists.
    #[must_use]
    pub fn upgrade_surface(&self) -> Option<Arc<dyn RenderSurface>> {
        self.surface.as_ref().and_then(Weak::upgrade)
    }

    /// Moves the staged values into `current`.
    ///
    /// The sync mode is copied. A pending replacement is consumed and
    /// returned as a [`RenderRequest`]; `current.surface` is left alone, it
    /// only changes once the request has been processed.
    pub fn transfer_into(&mut self, current: &mut RenderData) -> Transfer {
        let sync_mode_changed = current.sync_mode != self.sync_mode;
        current.sync_mode = self.sync_mode;

        let mut request = None;
        if self.replace_surface {
            self.replace_surface = false;
            if let Some(surface) = self.surface.take() {
                request = Some(RenderRequest::ReplaceSurface(ReplaceSurfaceRequest::new(
                    surface,
                )));
            }
        }

        Transfer {
            sync_mode_changed,
            request,
        }
    }
}
