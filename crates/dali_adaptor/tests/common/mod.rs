//! Recording collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dali_adaptor_core::{
    AdaptorServices, Core, DisplayConnection, Egl, EglFactory, GlAbstraction, RenderStatus,
    RenderSurface, SyncMode, TriggerEvent, UpdateStatus,
};
use parking_lot::{Condvar, Mutex};

/// Upper bound for anything a test waits on.
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Something a collaborator was asked to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Update,
    Render,
    ContextCreated,
    ContextDestroyed,
    GlPreRender,
    GlPostRender(u64),
    EglCreateContext,
    EglMakeCurrent,
    EglSetRefreshSync(SyncMode),
    EglTerminate,
    DisplayConsumeEvents,
    DisplayInitializeEgl,
    SurfaceStartRender(u32),
    SurfaceStopRender(u32),
    SurfaceInitializeEgl(u32),
    SurfaceCreate(u32),
    SurfaceDestroy(u32),
    SurfaceReplace(u32),
    SurfacePreRender { id: u32, ready: bool },
    SurfacePostRender { id: u32, replacing: bool },
    SurfaceResize(u32),
    Trigger(&'static str),
}

/// Ordered log of every collaborator call, from any thread.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    changed: Condvar,
}

impl Recorder {
    pub fn record(&self, event: Event) {
        self.events.lock().push(event);
        self.changed.notify_all();
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    /// Blocks until `predicate` holds for the log, or the timeout expires.
    pub fn wait_until(&self, mut predicate: impl FnMut(&[Event]) -> bool) -> bool {
        let deadline = Instant::now() + TIMEOUT;
        let mut events = self.events.lock();
        while !predicate(&events) {
            if self.changed.wait_until(&mut events, deadline).timed_out() {
                return predicate(&events);
            }
        }
        true
    }

    /// Blocks until `event` has been recorded at least `times` times.
    pub fn wait_for_count(&self, event: &Event, times: usize) -> bool {
        self.wait_until(|events| events.iter().filter(|e| *e == event).count() >= times)
    }
}

pub fn position(events: &[Event], event: &Event) -> Option<usize> {
    events.iter().position(|e| e == event)
}

pub fn position_after(events: &[Event], start: usize, event: &Event) -> Option<usize> {
    events[start..].iter().position(|e| e == event).map(|i| i + start)
}

/// Every `Render` must follow a successful surface pre-render.
pub fn assert_renders_gated(events: &[Event]) {
    let mut armed = false;
    for (index, event) in events.iter().enumerate() {
        match event {
            Event::SurfacePreRender { ready, .. } => armed = *ready,
            Event::Render => {
                assert!(armed, "render at {index} without a successful pre-render: {events:?}");
                armed = false;
            }
            _ => {}
        }
    }
}

pub struct MockCore {
    recorder: Arc<Recorder>,
    pub keep_updating: AtomicU32,
    pub needs_update: AtomicBool,
    pub has_rendered: AtomicBool,
    pub needs_notification: AtomicBool,
    pub surface_rect_changed: AtomicBool,
    updates: AtomicU64,
    renders: AtomicU64,
}

impl MockCore {
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::SeqCst)
    }
}

impl Core for MockCore {
    fn update(
        &self,
        _elapsed_seconds: f32,
        last_vsync_ms: u64,
        next_vsync_ms: u64,
        status: &mut UpdateStatus,
    ) {
        assert!(next_vsync_ms >= last_vsync_ms);
        self.updates.fetch_add(1, Ordering::SeqCst);
        status.keep_updating = self.keep_updating.load(Ordering::SeqCst);
        status.needs_notification = self.needs_notification.load(Ordering::SeqCst);
        status.surface_rect_changed = self.surface_rect_changed.load(Ordering::SeqCst);
        self.recorder.record(Event::Update);
    }

    fn render(&self, status: &mut RenderStatus) {
        self.renders.fetch_add(1, Ordering::SeqCst);
        status.needs_update = self.needs_update.load(Ordering::SeqCst);
        status.has_rendered = self.has_rendered.load(Ordering::SeqCst);
        self.recorder.record(Event::Render);
    }

    fn context_created(&self) {
        self.recorder.record(Event::ContextCreated);
    }

    fn context_destroyed(&self) {
        self.recorder.record(Event::ContextDestroyed);
    }
}

struct MockGl {
    recorder: Arc<Recorder>,
}

impl GlAbstraction for MockGl {
    fn pre_render(&self) {
        self.recorder.record(Event::GlPreRender);
    }

    fn post_render(&self, time_delta_us: u64) {
        self.recorder.record(Event::GlPostRender(time_delta_us));
    }
}

struct MockEgl {
    recorder: Arc<Recorder>,
}

impl Egl for MockEgl {
    fn create_context(&mut self) {
        self.recorder.record(Event::EglCreateContext);
    }

    fn make_context_current(&mut self) {
        self.recorder.record(Event::EglMakeCurrent);
    }

    fn set_refresh_sync(&mut self, mode: SyncMode) -> bool {
        self.recorder.record(Event::EglSetRefreshSync(mode));
        true
    }

    fn terminate_gles(&mut self) {
        self.recorder.record(Event::EglTerminate);
    }
}

struct MockEglFactory {
    recorder: Arc<Recorder>,
}

impl EglFactory for MockEglFactory {
    fn create(&self) -> Box<dyn Egl> {
        Box::new(MockEgl {
            recorder: Arc::clone(&self.recorder),
        })
    }
}

struct MockDisplay {
    recorder: Arc<Recorder>,
}

impl DisplayConnection for MockDisplay {
    fn consume_events(&self) {
        self.recorder.record(Event::DisplayConsumeEvents);
    }

    fn initialize_egl(&self, _egl: &mut dyn Egl) {
        self.recorder.record(Event::DisplayInitializeEgl);
    }
}

pub struct MockSurface {
    id: u32,
    recorder: Arc<Recorder>,
    pub renderable: AtomicBool,
    pub lose_context_on_replace: AtomicBool,
}

impl RenderSurface for MockSurface {
    fn start_render(&self) {
        self.recorder.record(Event::SurfaceStartRender(self.id));
    }

    fn stop_render(&self) {
        self.renderable.store(false, Ordering::SeqCst);
        self.recorder.record(Event::SurfaceStopRender(self.id));
    }

    fn initialize_egl(&self, _egl: &mut dyn Egl) {
        self.recorder.record(Event::SurfaceInitializeEgl(self.id));
    }

    fn create_egl_surface(&self, _egl: &mut dyn Egl) {
        self.recorder.record(Event::SurfaceCreate(self.id));
    }

    fn destroy_egl_surface(&self, _egl: &mut dyn Egl) {
        self.recorder.record(Event::SurfaceDestroy(self.id));
    }

    fn replace_egl_surface(&self, _egl: &mut dyn Egl) -> bool {
        self.recorder.record(Event::SurfaceReplace(self.id));
        self.lose_context_on_replace.load(Ordering::SeqCst)
    }

    fn pre_render(&self, _egl: &mut dyn Egl, _gl: &dyn GlAbstraction) -> bool {
        let ready = self.renderable.load(Ordering::SeqCst);
        self.recorder.record(Event::SurfacePreRender { id: self.id, ready });
        ready
    }

    fn post_render(
        &self,
        _egl: &mut dyn Egl,
        _gl: &dyn GlAbstraction,
        _display: &dyn DisplayConnection,
        _time_delta_us: u64,
        replacing: bool,
    ) {
        self.recorder.record(Event::SurfacePostRender {
            id: self.id,
            replacing,
        });
    }

    fn resize(&self) {
        self.recorder.record(Event::SurfaceResize(self.id));
    }
}

pub struct MockTrigger {
    name: &'static str,
    recorder: Arc<Recorder>,
    fired: AtomicU32,
}

impl MockTrigger {
    pub fn fired(&self) -> u32 {
        self.fired.load(Ordering::SeqCst)
    }
}

impl TriggerEvent for MockTrigger {
    fn trigger(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
        self.recorder.record(Event::Trigger(self.name));
    }
}

/// One set of recording collaborators.
pub struct Harness {
    pub recorder: Arc<Recorder>,
    pub core: Arc<MockCore>,
    pub services: AdaptorServices,
}

impl Harness {
    pub fn new() -> Self {
        let recorder = Arc::new(Recorder::default());
        let core = Arc::new(MockCore {
            recorder: Arc::clone(&recorder),
            keep_updating: AtomicU32::new(UpdateStatus::KEEP_UPDATING_ANIMATIONS),
            needs_update: AtomicBool::new(false),
            has_rendered: AtomicBool::new(true),
            needs_notification: AtomicBool::new(false),
            surface_rect_changed: AtomicBool::new(false),
            updates: AtomicU64::new(0),
            renders: AtomicU64::new(0),
        });

        let services = AdaptorServices {
            core: Arc::clone(&core) as Arc<dyn Core>,
            gl: Arc::new(MockGl {
                recorder: Arc::clone(&recorder),
            }),
            egl_factory: Arc::new(MockEglFactory {
                recorder: Arc::clone(&recorder),
            }),
            display: Arc::new(MockDisplay {
                recorder: Arc::clone(&recorder),
            }),
            performance: None,
        };

        Self {
            recorder,
            core,
            services,
        }
    }

    /// A drawable surface. Keep the returned `Arc` alive for as long as it is used.
    pub fn surface(&self, id: u32) -> Arc<MockSurface> {
        Arc::new(MockSurface {
            id,
            recorder: Arc::clone(&self.recorder),
            renderable: AtomicBool::new(true),
            lose_context_on_replace: AtomicBool::new(false),
        })
    }

    pub fn trigger(&self, name: &'static str) -> Arc<MockTrigger> {
        Arc::new(MockTrigger {
            name,
            recorder: Arc::clone(&self.recorder),
            fired: AtomicU32::new(0),
        })
    }
}

/// Upcasts a mock surface for the adaptor APIs.
pub fn as_surface(surface: &Arc<MockSurface>) -> Arc<dyn RenderSurface> {
    Arc::clone(surface) as Arc<dyn RenderSurface>
}
