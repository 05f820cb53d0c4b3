//! # Combined Update/Render Controller
//!
//! The single-thread model: one OS thread updates the scene, renders it and
//! sleeps until the next frame boundary. The event thread steers it through
//! a run mode guarded by one mutex and condition variable.

mod combined;

pub use combined::{
    CombinedUpdateRenderController, ControllerState, PostRenderSync, MAXIMUM_UPDATE_REQUESTS,
};
