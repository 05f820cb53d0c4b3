//! # DALi Adaptor Core
//!
//! Contracts and data shared between the event/update side and the render
//! side of the adaptor.
//!
//! ## Architecture Rules
//!
//! 1. **Collaborators are traits** - GPU core, GL, EGL, surfaces and the display
//!    connection are consumed, never implemented, here.
//! 2. **Surfaces are never owned** - they are referenced through `Weak` and may
//!    vanish between two frames.
//! 3. **One writer per side** - the event thread only stages values, the render
//!    thread only consumes them.
//! 4. **Fatal means fatal** - broken thread contracts panic, configuration
//!    problems return [`AdaptorError`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod fps_tracker;
pub mod frame_time;
pub mod interfaces;
pub mod logging;
pub mod options;
pub mod render_data;
pub mod request;
pub mod time;
pub mod update_status_logger;

#[cfg(test)]
mod test_support;

pub use error::{AdaptorError, AdaptorResult};
pub use fps_tracker::FpsTracker;
pub use frame_time::{FrameDuration, FramePacer};
pub use interfaces::{
    AdaptorServices, Core, DisplayConnection, Egl, EglFactory, GlAbstraction,
    PerformanceInterface, PerformanceMarker, RenderStatus, RenderSurface, SurfaceRef, SyncMode,
    TriggerEvent, UpdateStatus,
};
pub use logging::{LogInstallGuard, LogOptions};
pub use options::EnvironmentOptions;
pub use render_data::{RenderData, Transfer};
pub use request::{RenderRequest, ReplaceSurfaceRequest, RequestKind};
pub use time::TimeService;
pub use update_status_logger::UpdateStatusLogger;
