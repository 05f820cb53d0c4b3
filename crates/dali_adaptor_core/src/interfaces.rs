//! # Collaborator Interfaces
//!
//! Everything the adaptor threads drive but do not implement.
//!
//! ```text
//!   EVENT THREAD                 RENDER THREAD
//!   ┌──────────────┐             ┌──────────────────────────────┐
//!   │ Core::update │             │ EglFactory::create ─► Egl    │
//!   └──────────────┘             │ RenderSurface (Weak)         │
//!                                │ DisplayConnection            │
//!                                │ GlAbstraction                │
//!                                │ Core::render                 │
//!                                └──────────────────────────────┘
//! ```
//!
//! Shared collaborators are `Send + Sync` and take `&self`; the EGL object is
//! the exception. It is created on, and exclusively owned by, the render
//! thread, so its methods take `&mut self`.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

/// Non-owning reference to a render surface.
///
/// The windowing layer owns surfaces; the render thread only upgrades the
/// reference for the duration of one call.
pub type SurfaceRef = Weak<dyn RenderSurface>;

/// How many display refreshes a frame is held for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum SyncMode {
    /// Swap as soon as the frame is ready.
    NoSync = 0,
    /// One frame per refresh.
    #[default]
    FullSync = 1,
    /// One frame every two refreshes.
    HalfSync = 2,
    /// One frame every four refreshes.
    QuarterSync = 4,
}

impl SyncMode {
    /// Number of display refreshes per frame.
    #[must_use]
    pub const fn refreshes_per_frame(self) -> u32 {
        self as u32
    }

    /// Parses the numeric form used by environment variables.
    #[must_use]
    pub const fn from_refreshes(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::NoSync),
            1 => Some(Self::FullSync),
            2 => Some(Self::HalfSync),
            4 => Some(Self::QuarterSync),
            _ => None,
        }
    }
}

/// Output of [`Core::render`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStatus {
    /// The scene needs another update after this frame.
    pub needs_update: bool,
    /// Something was actually drawn, so post-render must run.
    pub has_rendered: bool,
}

/// Output of [`Core::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateStatus {
    /// Bit set of `UpdateStatus::KEEP_UPDATING_*` reasons. Zero means idle.
    pub keep_updating: u32,
    /// The event thread must process a notification.
    pub needs_notification: bool,
    /// The surface rectangle changed during this update.
    pub surface_rect_changed: bool,
}

impl UpdateStatus {
    /// The stage requested another frame.
    pub const KEEP_UPDATING_STAGE: u32 = 1 << 0;
    /// Animations are running.
    pub const KEEP_UPDATING_ANIMATIONS: u32 = 1 << 1;
    /// Performance monitoring needs regular frames.
    pub const KEEP_UPDATING_MONITORING: u32 = 1 << 2;
    /// A render task waits for a synchronous result.
    pub const KEEP_UPDATING_RENDER_TASK_SYNC: u32 = 1 << 3;

    /// Returns true if any reason to keep updating is set.
    #[must_use]
    pub const fn keeps_updating(&self) -> bool {
        self.keep_updating != 0
    }
}

/// The scene-graph core.
pub trait Core: Send + Sync {
    /// Advances the scene by `elapsed_seconds`.
    fn update(
        &self,
        elapsed_seconds: f32,
        last_vsync_ms: u64,
        next_vsync_ms: u64,
        status: &mut UpdateStatus,
    );

    /// Renders one frame into the current surface.
    fn render(&self, status: &mut RenderStatus);

    /// A graphics context is now current on the render thread.
    fn context_created(&self);

    /// The graphics context is about to go away.
    fn context_destroyed(&self);
}

/// GL-level frame bracketing.
pub trait GlAbstraction: Send + Sync {
    /// Called before the core renders.
    fn pre_render(&self);

    /// Called after a frame that actually rendered.
    fn post_render(&self, time_delta_us: u64);
}

/// The platform graphics-context object. Owned by the render thread.
pub trait Egl: Send {
    /// Creates the graphics context.
    fn create_context(&mut self);

    /// Binds the context to the calling thread.
    fn make_context_current(&mut self);

    /// Applies a swap interval. Returns false if the platform refused it.
    fn set_refresh_sync(&mut self, mode: SyncMode) -> bool;

    /// Releases the context and all GL state.
    fn terminate_gles(&mut self);
}

/// Creates the [`Egl`] object on the render thread.
pub trait EglFactory: Send + Sync {
    /// Creates a fresh graphics-context object.
    fn create(&self) -> Box<dyn Egl>;
}

/// A drawable window or pixmap owned by the windowing layer.
pub trait RenderSurface: Send + Sync {
    /// The render thread is about to start drawing into this surface.
    fn start_render(&self);

    /// Drawing must stop; later pre-render checks should fail.
    fn stop_render(&self);

    /// Binds the surface to the graphics-context object.
    fn initialize_egl(&self, egl: &mut dyn Egl);

    /// Creates the platform drawing surface.
    fn create_egl_surface(&self, egl: &mut dyn Egl);

    /// Destroys the platform drawing surface.
    fn destroy_egl_surface(&self, egl: &mut dyn Egl);

    /// Takes over as the drawing surface. Returns true if the context was lost.
    fn replace_egl_surface(&self, egl: &mut dyn Egl) -> bool;

    /// Returns true if the surface can be drawn to now.
    fn pre_render(&self, egl: &mut dyn Egl, gl: &dyn GlAbstraction) -> bool;

    /// Presents a rendered frame.
    fn post_render(
        &self,
        egl: &mut dyn Egl,
        gl: &dyn GlAbstraction,
        display: &dyn DisplayConnection,
        time_delta_us: u64,
        replacing: bool,
    );

    /// The surface size changed; recreate whatever depends on it.
    fn resize(&self) {}
}

/// Connection to the display server.
pub trait DisplayConnection: Send + Sync {
    /// Drains pending display-server events on the render thread.
    fn consume_events(&self);

    /// Binds the connection to a (possibly new) graphics context.
    fn initialize_egl(&self, egl: &mut dyn Egl);
}

/// Wakes the event thread from another thread.
pub trait TriggerEvent: Send + Sync {
    /// Fires the trigger.
    fn trigger(&self);
}

/// Points in the frame pipeline that can be recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PerformanceMarker {
    /// The update side was paused.
    Paused,
    /// The update side resumed.
    Resume,
    /// An update started.
    UpdateStart,
    /// An update finished.
    UpdateEnd,
    /// A frame render started.
    RenderStart,
    /// A frame render finished.
    RenderEnd,
}

/// Receives pipeline markers.
pub trait PerformanceInterface: Send + Sync {
    /// Records one marker.
    fn add_marker(&self, marker: PerformanceMarker);
}

/// The shared collaborators handed to both threads.
#[derive(Clone)]
pub struct AdaptorServices {
    /// Scene-graph core.
    pub core: Arc<dyn Core>,
    /// GL abstraction.
    pub gl: Arc<dyn GlAbstraction>,
    /// Factory for the render thread's graphics-context object.
    pub egl_factory: Arc<dyn EglFactory>,
    /// Display connection.
    pub display: Arc<dyn DisplayConnection>,
    /// Optional performance marker sink.
    pub performance: Option<Arc<dyn PerformanceInterface>>,
}

impl AdaptorServices {
    /// Records `marker` if a performance sink is installed.
    #[inline]
    pub fn add_marker(&self, marker: PerformanceMarker) {
        if let Some(performance) = &self.performance {
            performance.add_marker(marker);
        }
    }
}

impl std::fmt::Debug for AdaptorServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptorServices")
            .field("performance", &self.performance.is_some())
            .finish_non_exhaustive()
    }
}
