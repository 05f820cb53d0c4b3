//! Graphics sequencing shared by both threading models.
//!
//! Owns the EGL object and the render-side [`RenderData`]; everything here
//! runs on the thread that renders.

use std::sync::Arc;

use dali_adaptor_core::{AdaptorServices, Egl, RenderData, RenderSurface, SyncMode};

/// Render-side graphics state.
pub(crate) struct RenderHelper {
    services: AdaptorServices,
    egl: Option<Box<dyn Egl>>,
    current: RenderData,
    applied_sync_mode: SyncMode,
}

impl RenderHelper {
    pub(crate) fn new(services: AdaptorServices, current: RenderData) -> Self {
        let applied_sync_mode = current.sync_mode;
        Self {
            services,
            egl: None,
            current,
            applied_sync_mode,
        }
    }

    /// Render-side data, for the synchronization transfer.
    pub(crate) fn current_mut(&mut self) -> &mut RenderData {
        &mut self.current
    }

    /// Creates the graphics context and makes it current.
    ///
    /// # Panics
    ///
    /// Panics if no live surface is assigned, or if called twice.
    pub(crate) fn initialize_egl(&mut self) {
        assert!(self.egl.is_none(), "graphics context already initialized");
        let Some(surface) = self.current.upgrade_surface() else {
            panic!("no render surface present when initializing the graphics context");
        };

        let mut egl = self.services.egl_factory.create();
        surface.initialize_egl(egl.as_mut());
        self.services.display.initialize_egl(egl.as_mut());
        egl.create_context();
        surface.create_egl_surface(egl.as_mut());
        egl.make_context_current();
        if !egl.set_refresh_sync(self.current.sync_mode) {
            tracing::warn!("Refresh sync {:?} refused", self.current.sync_mode);
        }
        self.applied_sync_mode = self.current.sync_mode;
        self.egl = Some(egl);

        self.services.core.context_created();
        tracing::info!("Graphics context initialized");
    }

    /// Pushes a changed sync mode to EGL.
    pub(crate) fn apply_sync_mode(&mut self) {
        if self.current.sync_mode == self.applied_sync_mode {
            return;
        }
        let mode = self.current.sync_mode;
        if let Some(egl) = self.egl.as_deref_mut() {
            if !egl.set_refresh_sync(mode) {
                tracing::warn!("Refresh sync {:?} refused", mode);
            }
        }
        self.applied_sync_mode = mode;
        tracing::debug!("Sync mode now {:?}", mode);
    }

    pub(crate) fn consume_events(&self) {
        self.services.display.consume_events();
    }

    /// Makes `surface` the render target.
    ///
    /// If the platform lost the context while switching, the core is told
    /// the context was destroyed and recreated before the new surface becomes
    /// current.
    ///
    /// # Panics
    ///
    /// Panics if the graphics context has not been initialized.
    pub(crate) fn replace_surface(&mut self, surface: &Arc<dyn RenderSurface>) {
        let Some(egl) = self.egl.as_deref_mut() else {
            panic!("surface replaced before the graphics context was initialized");
        };

        self.services.display.initialize_egl(egl);
        let context_lost = surface.replace_egl_surface(egl);
        if context_lost {
            tracing::warn!("Context lost while replacing the surface");
            self.services.core.context_destroyed();
            self.services.core.context_created();
        }

        self.current.surface = Some(Arc::downgrade(surface));
        self.current.replace_surface = true;
        tracing::info!("Render surface replaced");
    }

    /// Tells the current surface its size changed.
    pub(crate) fn resize_surface(&self) {
        if let Some(surface) = self.current.upgrade_surface() {
            surface.resize();
        }
    }

    /// Returns true if the current surface can be drawn to.
    ///
    /// Fails without side effects when the surface is gone.
    pub(crate) fn pre_render(&mut self) -> bool {
        let Some(egl) = self.egl.as_deref_mut() else {
            return false;
        };
        let Some(surface) = self.current.upgrade_surface() else {
            return false;
        };

        let gl = self.services.gl.as_ref();
        let ready = surface.pre_render(egl, gl);
        if ready {
            gl.pre_render();
        }
        ready
    }

    /// Presents the frame and clears the replaced-this-frame flag.
    pub(crate) fn post_render(&mut self, time_delta_us: u64) {
        let replacing = std::mem::take(&mut self.current.replace_surface);
        let Some(egl) = self.egl.as_deref_mut() else {
            return;
        };

        let gl = self.services.gl.as_ref();
        gl.post_render(time_delta_us);
        if let Some(surface) = self.current.upgrade_surface() {
            surface.post_render(egl, gl, self.services.display.as_ref(), time_delta_us, replacing);
        }
    }

    /// Clears the replaced-this-frame flag when no frame was presented.
    pub(crate) fn skip_post_render(&mut self) {
        self.current.replace_surface = false;
    }

    /// Tears the graphics context down. Does nothing if it was never created.
    pub(crate) fn shutdown_egl(&mut self) {
        let Some(mut egl) = self.egl.take() else {
            return;
        };

        self.services.core.context_destroyed();
        if let Some(surface) = self.current.upgrade_surface() {
            surface.destroy_egl_surface(egl.as_mut());
        }
        egl.terminate_gles();
        tracing::info!("Graphics context shut down");
    }
}
