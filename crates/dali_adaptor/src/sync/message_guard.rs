//! RAII writer for the staged render data.

use std::ops::{Deref, DerefMut};

use dali_adaptor_core::RenderData;
use parking_lot::{Condvar, MutexGuard};

use super::update_render_sync::SyncState;

/// Exclusive write access to the event-side copy of [`RenderData`].
///
/// The synchronization lock is held for the guard's whole lifetime. When the
/// guard drops, the new-data flag is raised and the render thread is woken
/// before the lock is released, however the writing scope is left.
///
/// ```text
///   {
///       let mut message = sync.send_message();   // lock
///       message.sync_mode = SyncMode::HalfSync;   // write
///   }                                             // flag, notify, unlock
/// ```
#[must_use = "the render thread is only told about new data when the guard drops"]
pub struct SendMessageGuard<'a> {
    state: MutexGuard<'a, SyncState>,
    wake: &'a Condvar,
}

impl<'a> SendMessageGuard<'a> {
    pub(crate) fn new(state: MutexGuard<'a, SyncState>, wake: &'a Condvar) -> Self {
        Self { state, wake }
    }

    /// Records that this message carries a request the event thread will wait for.
    pub(crate) fn begin_request(&mut self) {
        self.state.requests_posted += 1;
    }
}

impl Deref for SendMessageGuard<'_> {
    type Target = RenderData;

    fn deref(&self) -> &RenderData {
        &self.state.new_values
    }
}

impl DerefMut for SendMessageGuard<'_> {
    fn deref_mut(&mut self) -> &mut RenderData {
        &mut self.state.new_values
    }
}

impl Drop for SendMessageGuard<'_> {
    fn drop(&mut self) {
        self.state.new_data_available = true;
        self.wake.notify_all();
        // The mutex guard field is released after this body returns
    }
}

impl std::fmt::Debug for SendMessageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendMessageGuard")
            .field("new_values", &self.state.new_values)
            .finish()
    }
}
