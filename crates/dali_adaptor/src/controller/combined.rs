//! Update and render on one OS thread, paced by the thread itself.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use dali_adaptor_core::{
    AdaptorServices, EnvironmentOptions, FpsTracker, FrameDuration, FramePacer, LogOptions,
    PerformanceMarker, RenderData, RenderStatus, RenderSurface, SurfaceRef, TimeService,
    TriggerEvent, UpdateStatus, UpdateStatusLogger,
};
use parking_lot::{Condvar, Mutex};

use crate::render::RenderHelper;

const UPDATE_RENDER_THREAD_NAME: &str = "UpdateRenderThread";

/// Outstanding update requests needed before a sleep request is honoured.
pub const MAXIMUM_UPDATE_REQUESTS: u32 = 2;

/// Externally visible controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// No thread, or a thread that has not been started.
    Stopped,
    /// Updating and rendering every frame.
    RunningContinuous,
    /// Started, but the thread is parked.
    RunningPaused,
    /// Running a bounded number of cycles before parking again.
    RunningOnce {
        /// Cycles left.
        remaining: u32,
    },
}

/// How many update/render cycles the thread may run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunMode {
    Paused,
    Cycles(u32),
    Continuous,
}

struct ThreadState {
    run_mode: RunMode,
    use_elapsed_time_after_wait: bool,
    /// Set by the event thread once every update request has been served.
    can_sleep: bool,
    pending_request_update: bool,
    destroy: bool,
    new_surface: Option<Arc<dyn RenderSurface>>,
    surface_resized: bool,
    post_rendering: bool,
    frame_duration: FrameDuration,
}

struct ControllerShared {
    state: Mutex<ThreadState>,
    /// Wakes the update/render thread.
    wake: Condvar,
}

impl ControllerShared {
    fn notify(&self) {
        self.wake.notify_all();
    }
}

/// Lets a surface hold the update/render thread until the event thread has
/// finished with a presented frame.
#[derive(Clone)]
pub struct PostRenderSync {
    shared: Arc<ControllerShared>,
}

impl PostRenderSync {
    /// Called on the update/render thread when presentation begins.
    pub fn post_render_started(&self) {
        self.shared.state.lock().post_rendering = true;
    }

    /// Blocks the update/render thread until [`CombinedUpdateRenderController::post_render_complete`],
    /// a surface replacement, a resize, or a stop.
    pub fn post_render_wait_for_completion(&self) {
        let mut state = self.shared.state.lock();
        while state.post_rendering
            && state.new_surface.is_none()
            && !state.surface_resized
            && !state.destroy
        {
            self.shared.wake.wait(&mut state);
        }
    }
}

impl std::fmt::Debug for PostRenderSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PostRenderSync")
    }
}

/// Drives the single update/render thread.
///
/// ```text
///            start()                 pause()
///   Stopped ────────► Continuous ◄────────────► Paused
///      ▲                  │         resume()       │
///      │     stop()       │                        │ request_update_once()
///      └──────────────────┴──── Once(n) ◄──────────┘
///                                  │ n cycles
///                                  └──► back to the parked state
/// ```
///
/// Every method is called from the event thread.
pub struct CombinedUpdateRenderController {
    shared: Arc<ControllerShared>,
    services: AdaptorServices,
    options: EnvironmentOptions,
    surface: Option<SurfaceRef>,
    sleep_trigger: Arc<dyn TriggerEvent>,
    notification_trigger: Option<Arc<dyn TriggerEvent>>,
    log: LogOptions,
    thread: Option<JoinHandle<()>>,
    /// Posted by the thread after initialization and after each replacement.
    event_semaphore: Option<Receiver<()>>,
    initialization_acknowledged: bool,
    update_request_count: u32,
    running: bool,
    started: bool,
}

impl CombinedUpdateRenderController {
    /// Creates a controller that will draw into `surface`.
    #[must_use]
    pub fn new(
        services: AdaptorServices,
        surface: &Arc<dyn RenderSurface>,
        sleep_trigger: Arc<dyn TriggerEvent>,
        notification_trigger: Option<Arc<dyn TriggerEvent>>,
        options: EnvironmentOptions,
        log: LogOptions,
    ) -> Self {
        let frame_duration = FrameDuration::from_refresh_rate(options.render_refresh_rate);
        let shared = Arc::new(ControllerShared {
            state: Mutex::new(ThreadState {
                run_mode: RunMode::Paused,
                use_elapsed_time_after_wait: false,
                can_sleep: false,
                pending_request_update: false,
                destroy: false,
                new_surface: None,
                surface_resized: false,
                post_rendering: false,
                frame_duration,
            }),
            wake: Condvar::new(),
        });

        Self {
            shared,
            services,
            options,
            surface: Some(Arc::downgrade(surface)),
            sleep_trigger,
            notification_trigger,
            log,
            thread: None,
            event_semaphore: None,
            initialization_acknowledged: false,
            update_request_count: 0,
            running: false,
            started: false,
        }
    }

    /// Spawns the update/render thread, parked until [`Self::start`].
    ///
    /// # Panics
    ///
    /// Panics if the thread already exists or cannot be created.
    pub fn initialize(&mut self) {
        assert!(self.thread.is_none(), "update/render thread already created");

        let (semaphore, event_semaphore) = crossbeam_channel::unbounded();
        let current = RenderData {
            replace_surface: false,
            sync_mode: self.options.sync_mode,
            surface: self.surface.clone(),
        };
        let frame_duration = {
            let mut state = self.shared.state.lock();
            state.destroy = false;
            state.run_mode = RunMode::Paused;
            state.new_surface = None;
            state.frame_duration
        };
        let worker = UpdateRenderWorker {
            shared: Arc::clone(&self.shared),
            services: self.services.clone(),
            helper: RenderHelper::new(self.services.clone(), current),
            sleep_trigger: Arc::clone(&self.sleep_trigger),
            notification_trigger: self.notification_trigger.clone(),
            fps_tracker: FpsTracker::new(self.options.fps_tracking_seconds),
            status_logger: UpdateStatusLogger::new(self.options.update_status_logging_frequency),
            pacer: FramePacer::new(frame_duration),
            time: TimeService::new(),
            semaphore,
            log: self.log.clone(),
        };

        let handle = thread::Builder::new()
            .name(UPDATE_RENDER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .unwrap_or_else(|err| panic!("failed to create the update/render thread: {err}"));

        self.thread = Some(handle);
        self.event_semaphore = Some(event_semaphore);
        self.initialization_acknowledged = false;
        tracing::info!("Update/render thread created");
    }

    /// Waits for the thread to initialize graphics, then runs continuously.
    ///
    /// Initializes first if needed. Does nothing if already started.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        if self.thread.is_none() {
            self.initialize();
        }
        self.wait_for_initialization();

        self.running = true;
        self.started = true;
        self.run_update_render_thread(RunMode::Continuous, false);

        if let Some(surface) = self.surface.as_ref().and_then(Weak::upgrade) {
            surface.start_render();
        }
        tracing::info!("Update/render controller started");
    }

    /// Parks the thread after the current frame.
    pub fn pause(&mut self) {
        self.running = false;
        self.shared.state.lock().run_mode = RunMode::Paused;
        self.services.add_marker(PerformanceMarker::Paused);
        tracing::debug!("Update/render controller paused");
    }

    /// Runs continuously again, advancing animations by the time spent paused.
    pub fn resume(&mut self) {
        if !self.running && self.started {
            self.run_update_render_thread(RunMode::Continuous, true);
            self.running = true;
            self.services.add_marker(PerformanceMarker::Resume);
            tracing::debug!("Update/render controller resumed");
        }
    }

    /// Stops rendering, destroys the thread and waits for it to exit.
    ///
    /// Calling this again does nothing.
    pub fn stop(&mut self) {
        if let Some(surface) = self.surface.as_ref().and_then(Weak::upgrade) {
            surface.stop_render();
        }

        if let Some(handle) = self.thread.take() {
            self.shared.state.lock().destroy = true;
            self.shared.notify();
            if handle.join().is_err() {
                tracing::error!("Update/render thread panicked");
            }
            tracing::info!("Update/render thread stopped");
        }

        self.event_semaphore = None;
        self.running = false;
        self.started = false;
    }

    /// Asks for continuous updates until the scene goes idle again.
    pub fn request_update(&mut self) {
        if self.update_request_count < MAXIMUM_UPDATE_REQUESTS {
            self.update_request_count += 1;
        }

        if self.running && self.is_update_render_thread_paused() {
            self.run_update_render_thread(RunMode::Continuous, false);
        }

        self.shared.state.lock().pending_request_update = true;
        self.shared.notify();
    }

    /// Runs exactly one update/render cycle if the thread is parked or idle.
    pub fn request_update_once(&mut self) {
        if self.update_request_count < MAXIMUM_UPDATE_REQUESTS {
            self.update_request_count += 1;
        }

        if self.thread.is_some() && self.is_update_render_thread_paused() {
            self.run_update_render_thread(RunMode::Cycles(1), false);
        }
    }

    /// Switches to `surface` and blocks until the thread has done so.
    pub fn replace_surface(&mut self, surface: &Arc<dyn RenderSurface>) {
        self.surface = Some(Arc::downgrade(surface));
        if self.thread.is_none() {
            return;
        }
        self.wait_for_initialization();

        {
            let mut state = self.shared.state.lock();
            state.post_rendering = false;
            state.new_surface = Some(Arc::clone(surface));
        }
        self.shared.notify();

        if let Some(semaphore) = &self.event_semaphore {
            if semaphore.recv().is_err() {
                tracing::error!("Update/render thread exited before replacing the surface");
            }
        }
    }

    /// Tells the thread the surface size changed.
    ///
    /// The surface is resized on the first frame whose update reports the
    /// new surface rectangle.
    pub fn resize_surface(&self) {
        {
            let mut state = self.shared.state.lock();
            state.post_rendering = false;
            state.surface_resized = true;
        }
        self.shared.notify();
    }

    /// Renders one frame every `vsyncs_per_render` display refreshes.
    pub fn set_render_refresh_rate(&mut self, vsyncs_per_render: u32) {
        if vsyncs_per_render == self.options.render_refresh_rate {
            return;
        }
        self.options.render_refresh_rate = vsyncs_per_render;
        self.shared.state.lock().frame_duration = FrameDuration::from_refresh_rate(vsyncs_per_render);
        tracing::debug!("Render refresh rate set to {}", vsyncs_per_render);
    }

    /// Handles the sleep trigger on the event thread.
    ///
    /// The thread may sleep only once every outstanding update request has
    /// been served.
    pub fn process_sleep_request(&mut self) {
        self.update_request_count = self.update_request_count.saturating_sub(1);
        if self.update_request_count == 0 {
            self.shared.state.lock().can_sleep = true;
            tracing::debug!("Update/render thread allowed to sleep");
        }
    }

    /// Releases a thread blocked in [`PostRenderSync::post_render_wait_for_completion`].
    pub fn post_render_complete(&self) {
        self.shared.state.lock().post_rendering = false;
        self.shared.notify();
    }

    /// Handle for surfaces that synchronise presentation with the event thread.
    #[must_use]
    pub fn post_render_sync(&self) -> PostRenderSync {
        PostRenderSync {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        if self.thread.is_none() {
            return ControllerState::Stopped;
        }
        match self.shared.state.lock().run_mode {
            RunMode::Continuous => ControllerState::RunningContinuous,
            RunMode::Cycles(remaining) => ControllerState::RunningOnce { remaining },
            RunMode::Paused if self.started => ControllerState::RunningPaused,
            RunMode::Paused => ControllerState::Stopped,
        }
    }

    /// Outstanding update requests.
    #[must_use]
    pub const fn update_request_count(&self) -> u32 {
        self.update_request_count
    }

    fn wait_for_initialization(&mut self) {
        if self.initialization_acknowledged {
            return;
        }
        if let Some(semaphore) = &self.event_semaphore {
            if semaphore.recv().is_err() {
                tracing::error!("Update/render thread exited during initialization");
            }
        }
        self.initialization_acknowledged = true;
    }

    fn run_update_render_thread(&self, run_mode: RunMode, use_elapsed_time: bool) {
        let mut state = self.shared.state.lock();
        state.run_mode = run_mode;
        state.can_sleep = false;
        state.use_elapsed_time_after_wait = use_elapsed_time;
        drop(state);
        self.shared.notify();
    }

    fn is_update_render_thread_paused(&self) -> bool {
        let state = self.shared.state.lock();
        state.run_mode != RunMode::Continuous || state.can_sleep
    }
}

impl Drop for CombinedUpdateRenderController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CombinedUpdateRenderController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedUpdateRenderController")
            .field("state", &self.state())
            .field("update_request_count", &self.update_request_count)
            .finish_non_exhaustive()
    }
}

/// State moved onto the update/render thread.
struct UpdateRenderWorker {
    shared: Arc<ControllerShared>,
    services: AdaptorServices,
    helper: RenderHelper,
    sleep_trigger: Arc<dyn TriggerEvent>,
    notification_trigger: Option<Arc<dyn TriggerEvent>>,
    fps_tracker: FpsTracker,
    status_logger: UpdateStatusLogger,
    pacer: FramePacer,
    time: TimeService,
    semaphore: Sender<()>,
    log: LogOptions,
}

impl UpdateRenderWorker {
    fn run(mut self) {
        let _log = self.log.install();

        self.helper.initialize_egl();
        self.post_event_semaphore();

        let mut use_elapsed_time = true;
        let mut update_required = false;
        let mut last_frame_time = self.time.nanoseconds();

        while self.update_render_ready(&mut use_elapsed_time, update_required) {
            let frame_start = self.time.nanoseconds();
            self.fps_tracker
                .track_frame(use_elapsed_time, frame_start.saturating_sub(last_frame_time));
            last_frame_time = frame_start;

            if let Some(surface) = self.take_new_surface() {
                self.helper.replace_surface(&surface);
                self.post_event_semaphore();
            }

            // Update
            let frame_delta = self.pacer.frame_delta(use_elapsed_time);
            let last_vsync_ms = frame_start / 1_000_000;
            let next_vsync_ms = last_vsync_ms + self.pacer.duration().milliseconds;
            let mut update_status = UpdateStatus::default();

            self.services.add_marker(PerformanceMarker::UpdateStart);
            self.services
                .core
                .update(frame_delta, last_vsync_ms, next_vsync_ms, &mut update_status);
            self.services.add_marker(PerformanceMarker::UpdateEnd);

            if update_status.needs_notification {
                if let Some(trigger) = &self.notification_trigger {
                    trigger.trigger();
                }
            }

            // The viewport must already follow the new size before the surface is resized
            if update_status.surface_rect_changed && self.surface_resize_pending() {
                tracing::debug!("Resizing surface");
                self.helper.resize_surface();
                self.surface_resize_complete();
            }

            self.status_logger.log(update_status.keep_updating);

            // Render
            self.helper.consume_events();
            let mut render_status = RenderStatus::default();
            if self.helper.pre_render() {
                self.services.add_marker(PerformanceMarker::RenderStart);
                self.services.core.render(&mut render_status);
                self.services.add_marker(PerformanceMarker::RenderEnd);

                if render_status.has_rendered {
                    self.helper.post_render(self.pacer.duration().nanoseconds / 1_000);
                } else {
                    self.helper.skip_post_render();
                }
            } else {
                tracing::debug!("Surface not ready, frame not rendered");
            }

            update_required = update_status.keeps_updating() || render_status.needs_update;
            if !update_required {
                self.sleep_trigger.trigger();
            }

            // Sleep until the next frame boundary
            let duration = self.shared.state.lock().frame_duration;
            self.pacer.set_duration(duration);
            let sleep_until = self.pacer.end_frame(frame_start, self.time.nanoseconds());
            self.time.sleep_until(sleep_until);
        }

        self.helper.shutdown_egl();
        tracing::info!("Update/render thread exiting");
    }

    /// Waits until there is work. Returns false when the thread must exit.
    fn update_render_ready(&mut self, use_elapsed_time: &mut bool, update_required: bool) -> bool {
        *use_elapsed_time = true;

        let mut state = self.shared.state.lock();
        while (state.run_mode == RunMode::Paused
            || (state.can_sleep && !update_required && !state.pending_request_update))
            && !state.destroy
            && state.new_surface.is_none()
            && !state.surface_resized
        {
            // The first frame after waking is scheduled from its own start time
            self.pacer.reset();
            tracing::debug!("Update/render thread waiting");
            self.shared.wake.wait(&mut state);
            if !state.use_elapsed_time_after_wait {
                *use_elapsed_time = false;
            }
        }

        state.use_elapsed_time_after_wait = false;
        state.can_sleep = false;
        state.pending_request_update = false;
        if let RunMode::Cycles(remaining) = state.run_mode {
            state.run_mode = if remaining > 1 {
                RunMode::Cycles(remaining - 1)
            } else {
                RunMode::Paused
            };
        }

        !state.destroy
    }

    fn take_new_surface(&self) -> Option<Arc<dyn RenderSurface>> {
        self.shared.state.lock().new_surface.take()
    }

    fn surface_resize_pending(&self) -> bool {
        self.shared.state.lock().surface_resized
    }

    fn surface_resize_complete(&self) {
        self.shared.state.lock().surface_resized = false;
    }

    fn post_event_semaphore(&self) {
        // The controller may already have been dropped during shutdown
        let _ = self.semaphore.send(());
    }
}
