//! # Rendering
//!
//! The render thread of the separate update/render model, and the graphics
//! sequencing both models share.

mod helper;
mod render_thread;

pub(crate) use helper::RenderHelper;
pub use render_thread::RenderThread;
