//! # DALi Adaptor
//!
//! Keeps the event/update side and the GPU-bound render side of the adaptor
//! in step.
//!
//! Two threading models are provided:
//!
//! - [`RenderThread`] + [`UpdateRenderSynchronization`]: the render thread
//!   runs next to a separate update side and rendezvouses with it every frame.
//! - [`CombinedUpdateRenderController`]: one thread updates and renders,
//!   pacing itself without a vsync thread.
//!
//! ## Architecture Rules
//!
//! 1. **Two long-lived threads** - the event thread and one worker.
//! 2. **No polling** - every wait is a condition variable with a predicate.
//! 3. **The render thread owns the graphics context** - nothing else touches it.
//! 4. **Stop is explicit** - a stop flag, a notify, then a join.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod controller;
pub mod render;
pub mod sync;

pub use controller::{CombinedUpdateRenderController, ControllerState, PostRenderSync};
pub use render::RenderThread;
pub use sync::{SendMessageGuard, UpdateRenderSynchronization, UpdateSync};
