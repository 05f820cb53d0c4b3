//! The update/render rendezvous object.

use std::sync::Arc;

use dali_adaptor_core::{
    EnvironmentOptions, PerformanceInterface, PerformanceMarker, RenderData, RenderRequest,
    RenderSurface, SyncMode, TimeService,
};
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::message_guard::SendMessageGuard;

/// Everything both sides read or write, guarded by one mutex.
pub(crate) struct SyncState {
    running: bool,
    paused: bool,
    /// The last rendered frame asked for another update.
    update_required: bool,
    /// The event side asked for an update.
    update_requested: bool,
    allow_update_while_paused: bool,
    /// Frames prepared by the update side and not yet rendered.
    update_ready_count: u32,
    /// Event-side copy of the render data.
    pub(crate) new_values: RenderData,
    pub(crate) new_data_available: bool,
    /// Requests issued by the event side.
    pub(crate) requests_posted: u64,
    /// Ticket of the request handed to the render thread.
    request_in_flight: u64,
    /// Ticket of the last request the render thread completed.
    requests_completed: u64,
}

/// Result of [`UpdateRenderSynchronization::update_sync_with_render`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateSync {
    /// False once the synchronization has been stopped.
    pub running: bool,
    /// The last rendered frame asked for another update.
    pub render_needs_update: bool,
}

/// Rendezvous between the update side and the render thread.
///
/// Shared through an `Arc`. The update/event side calls the `update_*`,
/// lifecycle and request methods; the render thread calls the `render_*`
/// methods.
pub struct UpdateRenderSynchronization {
    state: Mutex<SyncState>,
    /// Render thread waits here for a prepared frame or new data.
    update_finished: Condvar,
    /// Update side waits here for the render thread to drain frames.
    render_finished: Condvar,
    /// Update side waits here while nothing needs updating.
    update_sleep: Condvar,
    /// Update side waits here while paused.
    paused: Condvar,
    /// Event side waits here for a request to complete.
    request_finished: Condvar,
    max_update_count: u32,
    time: TimeService,
    performance: Option<Arc<dyn PerformanceInterface>>,
}

impl UpdateRenderSynchronization {
    /// Creates a stopped synchronization object.
    #[must_use]
    pub fn new(
        options: &EnvironmentOptions,
        performance: Option<Arc<dyn PerformanceInterface>>,
    ) -> Self {
        let new_values = RenderData {
            sync_mode: options.sync_mode,
            ..RenderData::default()
        };

        Self {
            state: Mutex::new(SyncState {
                running: false,
                paused: false,
                update_required: false,
                update_requested: false,
                allow_update_while_paused: false,
                update_ready_count: 0,
                new_values,
                new_data_available: false,
                requests_posted: 0,
                request_in_flight: 0,
                requests_completed: 0,
            }),
            update_finished: Condvar::new(),
            render_finished: Condvar::new(),
            update_sleep: Condvar::new(),
            paused: Condvar::new(),
            request_finished: Condvar::new(),
            max_update_count: options.max_update_count.max(1),
            time: TimeService::new(),
            performance,
        }
    }

    fn add_marker(&self, marker: PerformanceMarker) {
        if let Some(performance) = &self.performance {
            performance.add_marker(marker);
        }
    }

    /// Frames the update side may prepare ahead of rendering.
    #[must_use]
    pub const fn max_update_count(&self) -> u32 {
        self.max_update_count
    }

    // =========================================================================
    // Lifecycle (event side)
    // =========================================================================

    /// Allows both sides to run.
    pub fn start(&self) {
        let mut state = self.state.lock();
        state.running = true;
        state.paused = false;
        state.update_required = true;
        state.update_ready_count = 0;
        tracing::info!("Update/render synchronization started");
    }

    /// Stops both sides and wakes every blocked caller.
    ///
    /// Every blocking method returns promptly after this, reporting that the
    /// synchronization is no longer running.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
        }

        self.update_finished.notify_all();
        self.render_finished.notify_all();
        self.update_sleep.notify_all();
        self.paused.notify_all();
        self.request_finished.notify_all();
        tracing::info!("Update/render synchronization stopped");
    }

    /// Returns true between [`Self::start`] and [`Self::stop`].
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Blocks the update side in [`Self::update_ready_to_run`].
    pub fn pause(&self) {
        self.state.lock().paused = true;
        self.add_marker(PerformanceMarker::Paused);
    }

    /// Releases a paused update side.
    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.paused.notify_all();
        self.add_marker(PerformanceMarker::Resume);
    }

    /// Returns true while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Asks for an update, waking a sleeping update side.
    pub fn update_requested(&self) {
        self.state.lock().update_requested = true;
        self.update_sleep.notify_all();
    }

    /// Lets exactly one update run while paused.
    pub fn update_while_paused(&self) {
        self.state.lock().allow_update_while_paused = true;
        self.paused.notify_all();
        self.update_sleep.notify_all();
    }

    // =========================================================================
    // Update side
    // =========================================================================

    /// Blocks while paused (unless one update is allowed). Returns false once stopped.
    pub fn update_ready_to_run(&self) -> bool {
        let mut state = self.state.lock();
        while state.running && state.paused && !state.allow_update_while_paused {
            self.paused.wait(&mut state);
        }
        state.allow_update_while_paused = false;
        let running = state.running;
        drop(state);

        if running {
            self.add_marker(PerformanceMarker::UpdateStart);
        }
        running
    }

    /// Announces a prepared frame and blocks while the render thread is
    /// `max_update_count` frames behind.
    pub fn update_sync_with_render(&self) -> UpdateSync {
        self.add_marker(PerformanceMarker::UpdateEnd);

        let mut state = self.state.lock();
        state.update_ready_count += 1;
        self.update_finished.notify_all();

        while state.running && state.update_ready_count >= self.max_update_count {
            self.render_finished.wait(&mut state);
        }

        UpdateSync {
            running: state.running,
            render_needs_update: state.update_required,
        }
    }

    /// Blocks until every prepared frame has been rendered.
    pub fn update_wait_for_all_rendering_to_finish(&self) {
        let mut state = self.state.lock();
        while state.running && state.update_ready_count > 0 {
            self.render_finished.wait(&mut state);
        }
    }

    /// Sleeps while neither side needs another update. Returns false once stopped.
    pub fn update_try_to_sleep(&self) -> bool {
        let mut state = self.state.lock();
        if !state.update_required && !state.update_requested && !state.allow_update_while_paused {
            while state.running && state.update_ready_count > 0 {
                self.render_finished.wait(&mut state);
            }
            tracing::debug!("Update side sleeping");
            while state.running
                && !state.update_required
                && !state.update_requested
                && !state.allow_update_while_paused
            {
                self.update_sleep.wait(&mut state);
            }
        }
        state.update_requested = false;
        state.running
    }

    // =========================================================================
    // Requests (event side)
    // =========================================================================

    /// Locks the event-side render data for writing.
    pub fn send_message(&self) -> SendMessageGuard<'_> {
        SendMessageGuard::new(self.state.lock(), &self.update_finished)
    }

    /// Stages a surface replacement. Does not block.
    ///
    /// A replacement staged before the render thread picked up the previous
    /// one supersedes it.
    pub fn replace_surface(&self, surface: &Arc<dyn RenderSurface>) {
        let mut message = self.send_message();
        message.replace_surface = true;
        message.surface = Some(Arc::downgrade(surface));
        message.begin_request();
    }

    /// Stages a new vsync mode.
    pub fn set_vsync_mode(&self, mode: SyncMode) {
        self.send_message().sync_mode = mode;
    }

    /// Blocks until the last staged request has been processed and a frame
    /// rendered, or the synchronization has stopped.
    pub fn wait_for_surface_replace_complete(&self) {
        let mut state = self.state.lock();
        while state.running && state.requests_completed < state.requests_posted {
            self.request_finished.wait(&mut state);
        }
    }

    // =========================================================================
    // Render side
    // =========================================================================

    /// Main render suspension point.
    ///
    /// Waits until a frame has been prepared, new data was sent, or the
    /// synchronization stops. Staged data is then moved into `current` and a
    /// pending request is placed in `request`. Returns false once stopped.
    pub fn render_sync_with_update(
        &self,
        current: &mut RenderData,
        request: &mut Option<RenderRequest>,
    ) -> bool {
        let mut state = self.state.lock();
        while state.running && state.update_ready_count == 0 && !state.new_data_available {
            self.update_finished.wait(&mut state);
        }
        let running = state.running;
        if running {
            Self::transfer(&mut state, current, request);
        }
        drop(state);

        if running {
            self.add_marker(PerformanceMarker::RenderStart);
        }
        running
    }

    /// Suspension point used while the surface cannot be drawn to.
    ///
    /// Waits for new data (typically a replacement surface) or a stop.
    /// Returns false once stopped.
    pub fn render_sync_with_request(
        &self,
        current: &mut RenderData,
        request: &mut Option<RenderRequest>,
    ) -> bool {
        let mut state = self.state.lock();
        while state.running && !state.new_data_available {
            self.update_finished.wait(&mut state);
        }
        let running = state.running;
        if running {
            Self::transfer(&mut state, current, request);
        }
        running
    }

    fn transfer(
        state: &mut MutexGuard<'_, SyncState>,
        current: &mut RenderData,
        request: &mut Option<RenderRequest>,
    ) {
        if !state.new_data_available {
            return;
        }
        state.new_data_available = false;

        let state = &mut **state;
        let transfer = state.new_values.transfer_into(current);
        if let Some(pending) = transfer.request {
            state.request_in_flight = state.requests_posted;
            tracing::debug!("Render thread received {:?}", pending.kind());
            *request = Some(pending);
        }
    }

    /// Reports a rendered frame.
    ///
    /// Dequeues one prepared frame, records whether the scene wants another
    /// update and, if a request was processed in this iteration, releases
    /// the event thread waiting on it.
    pub fn render_finished(&self, update_required: bool, request_processed: bool) {
        let mut state = self.state.lock();
        state.update_required = update_required;
        state.update_ready_count = state.update_ready_count.saturating_sub(1);
        if request_processed {
            state.requests_completed = state.request_in_flight;
            self.request_finished.notify_all();
        }
        self.render_finished.notify_all();
        if update_required {
            self.update_sleep.notify_all();
        }
        drop(state);

        self.add_marker(PerformanceMarker::RenderEnd);
    }

    /// Monotonic time in microseconds.
    #[must_use]
    pub fn time_microseconds(&self) -> u64 {
        self.time.microseconds()
    }
}

impl std::fmt::Debug for UpdateRenderSynchronization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("UpdateRenderSynchronization")
            .field("running", &state.running)
            .field("paused", &state.paused)
            .field("update_ready_count", &state.update_ready_count)
            .field("max_update_count", &self.max_update_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    use dali_adaptor_core::RequestKind;

    fn started() -> Arc<UpdateRenderSynchronization> {
        let sync = Arc::new(UpdateRenderSynchronization::new(
            &EnvironmentOptions::default(),
            None,
        ));
        sync.start();
        sync
    }

    #[test]
    fn test_render_waits_for_update() {
        let sync = started();
        let render_sync = Arc::clone(&sync);

        let render = thread::spawn(move || {
            let mut current = RenderData::default();
            let mut request = None;
            render_sync.render_sync_with_update(&mut current, &mut request)
        });

        thread::sleep(Duration::from_millis(20));
        assert!(!render.is_finished());

        let result = sync.update_sync_with_render();
        assert!(result.running);
        assert!(render.join().unwrap());
    }

    #[test]
    fn test_update_blocks_at_max_count() {
        let sync = started();
        assert_eq!(sync.max_update_count(), 2);

        // First frame fits in the queue
        assert!(sync.update_sync_with_render().running);

        let update_sync = Arc::clone(&sync);
        let update = thread::spawn(move || update_sync.update_sync_with_render());

        thread::sleep(Duration::from_millis(20));
        assert!(!update.is_finished());

        sync.render_finished(true, false);
        let result = update.join().unwrap();
        assert!(result.running);
        assert!(result.render_needs_update);
    }

    #[test]
    fn test_stop_releases_every_waiter() {
        let sync = started();
        sync.pause();

        let render_sync = Arc::clone(&sync);
        let render = thread::spawn(move || {
            let mut current = RenderData::default();
            let mut request = None;
            render_sync.render_sync_with_request(&mut current, &mut request)
        });
        let update_sync = Arc::clone(&sync);
        let update = thread::spawn(move || update_sync.update_ready_to_run());

        thread::sleep(Duration::from_millis(20));
        sync.stop();

        assert!(!render.join().unwrap());
        assert!(!update.join().unwrap());
        assert!(!sync.is_running());

        // Stopping twice is harmless
        sync.stop();
    }

    #[test]
    fn test_message_guard_wakes_render() {
        let sync = started();
        {
            let mut message = sync.send_message();
            message.sync_mode = SyncMode::QuarterSync;
        }

        let mut current = RenderData::default();
        let mut request = None;
        assert!(sync.render_sync_with_request(&mut current, &mut request));
        assert_eq!(current.sync_mode, SyncMode::QuarterSync);
        assert!(request.is_none());
    }

    #[test]
    fn test_update_while_paused_runs_once() {
        let sync = started();
        sync.pause();
        assert!(sync.is_paused());

        sync.update_while_paused();
        assert!(sync.update_ready_to_run());

        let update_sync = Arc::clone(&sync);
        let update = thread::spawn(move || update_sync.update_ready_to_run());
        thread::sleep(Duration::from_millis(20));
        assert!(!update.is_finished());

        sync.resume();
        assert!(update.join().unwrap());
    }

    #[test]
    fn test_try_to_sleep_until_requested() {
        let sync = started();
        sync.render_finished(false, false);

        let update_sync = Arc::clone(&sync);
        let update = thread::spawn(move || update_sync.update_try_to_sleep());
        thread::sleep(Duration::from_millis(20));
        assert!(!update.is_finished());

        sync.update_requested();
        assert!(update.join().unwrap());
    }

    #[test]
    fn test_performance_markers() {
        struct Markers(Mutex<Vec<PerformanceMarker>>);
        impl PerformanceInterface for Markers {
            fn add_marker(&self, marker: PerformanceMarker) {
                self.0.lock().push(marker);
            }
        }

        let markers = Arc::new(Markers(Mutex::new(Vec::new())));
        let sync = UpdateRenderSynchronization::new(
            &EnvironmentOptions::default(),
            Some(Arc::clone(&markers) as Arc<dyn PerformanceInterface>),
        );
        sync.start();

        assert!(sync.update_ready_to_run());
        sync.update_sync_with_render();
        let mut current = RenderData::default();
        let mut request = None;
        assert!(sync.render_sync_with_update(&mut current, &mut request));
        sync.render_finished(false, false);
        sync.pause();
        sync.resume();

        assert_eq!(
            *markers.0.lock(),
            vec![
                PerformanceMarker::UpdateStart,
                PerformanceMarker::UpdateEnd,
                PerformanceMarker::RenderStart,
                PerformanceMarker::RenderEnd,
                PerformanceMarker::Paused,
                PerformanceMarker::Resume,
            ]
        );
    }

    #[test]
    fn test_replace_request_completion() {
        struct Surface;
        impl RenderSurface for Surface {
            fn start_render(&self) {}
            fn stop_render(&self) {}
            fn initialize_egl(&self, _egl: &mut dyn dali_adaptor_core::Egl) {}
            fn create_egl_surface(&self, _egl: &mut dyn dali_adaptor_core::Egl) {}
            fn destroy_egl_surface(&self, _egl: &mut dyn dali_adaptor_core::Egl) {}
            fn replace_egl_surface(&self, _egl: &mut dyn dali_adaptor_core::Egl) -> bool {
                false
            }
            fn pre_render(
                &self,
                _egl: &mut dyn dali_adaptor_core::Egl,
                _gl: &dyn dali_adaptor_core::GlAbstraction,
            ) -> bool {
                true
            }
            fn post_render(
                &self,
                _egl: &mut dyn dali_adaptor_core::Egl,
                _gl: &dyn dali_adaptor_core::GlAbstraction,
                _display: &dyn dali_adaptor_core::DisplayConnection,
                _time_delta_us: u64,
                _replacing: bool,
            ) {
            }
        }

        let sync = started();
        let surface: Arc<dyn RenderSurface> = Arc::new(Surface);

        sync.replace_surface(&surface);

        let waiter_sync = Arc::clone(&sync);
        let waiter = thread::spawn(move || waiter_sync.wait_for_surface_replace_complete());

        let mut current = RenderData::default();
        let mut request = None;
        assert!(sync.render_sync_with_update(&mut current, &mut request));
        let request = request.expect("replace request delivered");
        assert_eq!(request.kind(), RequestKind::ReplaceSurface);

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        sync.render_finished(false, true);
        waiter.join().unwrap();
    }
}
