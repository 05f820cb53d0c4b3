//! The render OS thread for the separate update/render model.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use dali_adaptor_core::{
    AdaptorServices, Core, EnvironmentOptions, LogOptions, RenderData, RenderRequest,
    RenderStatus, RenderSurface, SurfaceRef, SyncMode,
};

use super::helper::RenderHelper;
use crate::sync::UpdateRenderSynchronization;

const RENDER_THREAD_NAME: &str = "RenderThread";

/// Owns the render thread.
///
/// All methods are called from the event thread. The spawned thread owns
/// the graphics context and the render-side copy of the render data.
///
/// ```text
///   new() ─► start() ─► [replace_surface() / set_vsync_mode()]* ─► stop()
/// ```
pub struct RenderThread {
    sync: Arc<UpdateRenderSynchronization>,
    services: AdaptorServices,
    surface: Option<SurfaceRef>,
    sync_mode: SyncMode,
    log: LogOptions,
    thread: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Creates a render thread that will draw into `surface` once started.
    #[must_use]
    pub fn new(
        sync: Arc<UpdateRenderSynchronization>,
        services: AdaptorServices,
        surface: &Arc<dyn RenderSurface>,
        options: &EnvironmentOptions,
        log: LogOptions,
    ) -> Self {
        Self {
            sync,
            services,
            surface: Some(Arc::downgrade(surface)),
            sync_mode: options.sync_mode,
            log,
            thread: None,
        }
    }

    /// Spawns the render thread and tells the surface rendering has started.
    ///
    /// # Panics
    ///
    /// Panics if the thread is already running or cannot be created.
    pub fn start(&mut self) {
        assert!(self.thread.is_none(), "render thread already running");

        let current = RenderData {
            replace_surface: false,
            sync_mode: self.sync_mode,
            surface: self.surface.clone(),
        };
        let worker = RenderWorker {
            sync: Arc::clone(&self.sync),
            core: Arc::clone(&self.services.core),
            helper: RenderHelper::new(self.services.clone(), current),
            log: self.log.clone(),
        };

        let handle = thread::Builder::new()
            .name(RENDER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .unwrap_or_else(|err| panic!("failed to create the render thread: {err}"));
        self.thread = Some(handle);

        if let Some(surface) = self.surface.as_ref().and_then(Weak::upgrade) {
            surface.start_render();
        }
        tracing::info!("Render thread started");
    }

    /// Stops rendering and joins the thread.
    ///
    /// The surface is told to stop and forgotten, then the synchronization is
    /// stopped so the thread leaves whichever suspension point it is in.
    /// Calling this again, or before [`Self::start`], does nothing.
    pub fn stop(&mut self) {
        if let Some(surface) = self.surface.take().and_then(|surface| surface.upgrade()) {
            surface.stop_render();
        }

        if let Some(handle) = self.thread.take() {
            self.sync.stop();
            if handle.join().is_err() {
                tracing::error!("Render thread panicked");
            }
            tracing::info!("Render thread stopped");
        }
    }

    /// Hands a new surface to the render thread. Does not block.
    ///
    /// The thread must have been started. Use
    /// [`Self::wait_for_surface_replace_complete`] to wait for the switch.
    ///
    /// # Panics
    ///
    /// Panics if `surface` is already the render surface.
    pub fn replace_surface(&mut self, surface: &Arc<dyn RenderSurface>) {
        let replacement = Arc::downgrade(surface);
        if let Some(existing) = &self.surface {
            assert!(
                !Weak::ptr_eq(existing, &replacement),
                "replacement surface is already the render surface"
            );
        }

        self.surface = Some(replacement);
        self.sync.replace_surface(surface);
    }

    /// Blocks until the render thread has switched to the last replacement.
    pub fn wait_for_surface_replace_complete(&self) {
        self.sync.wait_for_surface_replace_complete();
    }

    /// Changes the refresh synchronisation from the next frame on.
    pub fn set_vsync_mode(&mut self, mode: SyncMode) {
        self.sync_mode = mode;
        self.sync.set_vsync_mode(mode);
    }

    /// Returns true between [`Self::start`] and [`Self::stop`].
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Returns true while a surface is assigned.
    #[must_use]
    pub const fn has_surface(&self) -> bool {
        self.surface.is_some()
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RenderThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThread")
            .field("running", &self.is_running())
            .field("has_surface", &self.has_surface())
            .field("sync_mode", &self.sync_mode)
            .finish_non_exhaustive()
    }
}

/// State moved onto the render thread.
struct RenderWorker {
    sync: Arc<UpdateRenderSynchronization>,
    core: Arc<dyn Core>,
    helper: RenderHelper,
    log: LogOptions,
}

impl RenderWorker {
    fn run(mut self) {
        let _log = self.log.install();

        self.helper.initialize_egl();
        let mut last_frame_time = self.sync.time_microseconds();

        let mut request = None;
        let mut running = self
            .sync
            .render_sync_with_update(self.helper.current_mut(), &mut request);

        while running {
            self.helper.apply_sync_mode();
            self.helper.consume_events();
            let mut request_processed = self.process_request(request.take());

            // Nothing is drawn until the surface accepts a frame
            while !self.helper.pre_render() {
                tracing::debug!("Surface not ready, waiting for a request");
                running = self
                    .sync
                    .render_sync_with_request(self.helper.current_mut(), &mut request);
                if !running {
                    break;
                }
                self.helper.apply_sync_mode();
                request_processed |= self.process_request(request.take());
            }
            if !running {
                break;
            }

            let mut status = RenderStatus::default();
            self.core.render(&mut status);
            self.sync.render_finished(status.needs_update, request_processed);

            let now = self.sync.time_microseconds();
            if status.has_rendered {
                self.helper.post_render(now.saturating_sub(last_frame_time));
            } else {
                self.helper.skip_post_render();
            }
            last_frame_time = now;

            running = self
                .sync
                .render_sync_with_update(self.helper.current_mut(), &mut request);
        }

        self.helper.shutdown_egl();
        tracing::info!("Render thread exiting");
    }

    /// Executes a request. Returns true if one was processed.
    ///
    /// # Panics
    ///
    /// Panics if a replace request names a surface that no longer exists.
    fn process_request(&mut self, request: Option<RenderRequest>) -> bool {
        let Some(mut request) = request else {
            return false;
        };

        match &mut request {
            RenderRequest::ReplaceSurface(replace) => {
                let Some(surface) = replace.surface() else {
                    panic!("replace request names a surface that no longer exists");
                };
                self.helper.replace_surface(&surface);
                replace.mark_completed();
            }
        }
        request.is_completed()
    }
}
