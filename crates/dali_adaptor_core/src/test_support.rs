//! Minimal collaborators for unit tests.

use crate::interfaces::{DisplayConnection, Egl, GlAbstraction, RenderSurface};

/// A surface that accepts every call and is always drawable.
pub(crate) struct NullSurface;

impl RenderSurface for NullSurface {
    fn start_render(&self) {}
    fn stop_render(&self) {}
    fn initialize_egl(&self, _egl: &mut dyn Egl) {}
    fn create_egl_surface(&self, _egl: &mut dyn Egl) {}
    fn destroy_egl_surface(&self, _egl: &mut dyn Egl) {}
    fn replace_egl_surface(&self, _egl: &mut dyn Egl) -> bool {
        false
    }
    fn pre_render(&self, _egl: &mut dyn Egl, _gl: &dyn GlAbstraction) -> bool {
        true
    }
    fn post_render(
        &self,
        _egl: &mut dyn Egl,
        _gl: &dyn GlAbstraction,
        _display: &dyn DisplayConnection,
        _time_delta_us: u64,
        _replacing: bool,
    ) {
    }
}
