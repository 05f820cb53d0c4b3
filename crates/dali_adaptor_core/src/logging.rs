//! # Per-Thread Logging
//!
//! Worker threads do not share a global logger. The owner hands each thread a
//! [`LogOptions`]; the thread installs it as its thread-local default on entry
//! and the returned guard uninstalls it when the thread leaves its loop.

use tracing::dispatcher::{self, DefaultGuard};
use tracing::Dispatch;

use crate::error::AdaptorResult;
use crate::options::EnvironmentOptions;

/// A log destination that can be installed on any thread.
#[derive(Clone)]
pub struct LogOptions {
    dispatch: Dispatch,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::capture_current()
    }
}

impl std::fmt::Debug for LogOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogOptions").finish_non_exhaustive()
    }
}

impl LogOptions {
    /// Wraps an existing dispatcher.
    #[must_use]
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Uses whatever dispatcher is active on the calling thread.
    #[must_use]
    pub fn capture_current() -> Self {
        Self::new(dispatcher::get_default(Dispatch::clone))
    }

    /// Discards every event.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Dispatch::none())
    }

    /// Builds a formatted stdout logger at the configured level.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured log level is unknown.
    pub fn from_options(options: &EnvironmentOptions) -> AdaptorResult<Self> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(options.level_filter()?)
            .with_thread_names(true)
            .finish();
        Ok(Self::new(Dispatch::new(subscriber)))
    }

    /// Installs the destination for the calling thread until the guard drops.
    #[must_use = "logging is uninstalled as soon as the guard is dropped"]
    pub fn install(&self) -> LogInstallGuard {
        LogInstallGuard {
            _guard: dispatcher::set_default(&self.dispatch),
        }
    }
}

/// Keeps a [`LogOptions`] installed on the current thread.
pub struct LogInstallGuard {
    _guard: DefaultGuard,
}

impl std::fmt::Debug for LogInstallGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LogInstallGuard")
    }
}
