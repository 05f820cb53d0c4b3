//! # Render Requests
//!
//! Commands the event thread sends to the render thread. The set is closed:
//! the render thread dispatches with an exhaustive `match`, so adding a kind
//! is a compile error until every consumer handles it.

use std::sync::{Arc, Weak};

use crate::interfaces::RenderSurface;

/// Discriminant of a [`RenderRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// See [`RenderRequest::ReplaceSurface`].
    ReplaceSurface,
}

/// A command for the render thread.
#[derive(Debug)]
pub enum RenderRequest {
    /// Swap the render target for another surface.
    ReplaceSurface(ReplaceSurfaceRequest),
}

impl RenderRequest {
    /// Builds a replace request for `surface`.
    #[must_use]
    pub fn replace_surface(surface: &Arc<dyn RenderSurface>) -> Self {
        Self::ReplaceSurface(ReplaceSurfaceRequest::new(Arc::downgrade(surface)))
    }

    /// Returns the request kind.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::ReplaceSurface(_) => RequestKind::ReplaceSurface,
        }
    }

    /// Returns true once the render thread has finished with the request.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        match self {
            Self::ReplaceSurface(request) => request.is_completed(),
        }
    }
}

/// Replace the current render surface.
#[derive(Debug)]
pub struct ReplaceSurfaceRequest {
    surface: Weak<dyn RenderSurface>,
    completed: bool,
}

impl ReplaceSurfaceRequest {
    /// Creates an uncompleted request.
    #[must_use]
    pub fn new(surface: Weak<dyn RenderSurface>) -> Self {
        Self {
            surface,
            completed: false,
        }
    }

    /// The surface to switch to, if it still exists.
    #[must_use]
    pub fn surface(&self) -> Option<Arc<dyn RenderSurface>> {
        self.surface.upgrade()
    }

    /// Marks the replacement as done.
    #[inline]
    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// Returns true once [`Self::mark_completed`] was called.
    #[inline]
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }
}
