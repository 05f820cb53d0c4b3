//! # Update/Render Synchronization
//!
//! The rendezvous between the update side and the render thread when they
//! run on separate OS threads.
//!
//! ```text
//!   UPDATE / EVENT SIDE                       RENDER THREAD
//!   ───────────────────                       ─────────────
//!   update_ready_to_run()  (blocks if paused)
//!   core.update()
//!   update_sync_with_render() ── count++ ──►  render_sync_with_update()
//!        blocks while count == max              core.render()
//!                              ◄── count-- ── render_finished()
//!
//!   replace_surface() ── SendMessageGuard ──► transfer under the lock
//!   wait_for_surface_replace_complete()         process request
//!                              ◄── completed ─ render_finished(.., true)
//! ```
//!
//! Every flag lives in one state struct behind one mutex; each blocking call
//! waits on a condition variable with a predicate re-checked under that lock,
//! so a wake-up can never be lost between a check and a wait.

mod message_guard;
mod update_render_sync;

pub use message_guard::SendMessageGuard;
pub use update_render_sync::{UpdateRenderSynchronization, UpdateSync};
