//! # Environment Options
//!
//! Tunables read once at startup, from a TOML file or from `DALI_*`
//! environment variables.
//!
//! ```toml
//! render_refresh_rate = 2
//! fps_tracking_seconds = 5
//! update_status_logging_frequency = 0
//! max_update_count = 2
//! sync_mode = "full_sync"
//! log_level = "debug"
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::error::{AdaptorError, AdaptorResult};
use crate::interfaces::SyncMode;

/// Vsyncs per rendered frame.
pub const ENV_REFRESH_RATE: &str = "DALI_REFRESH_RATE";
/// Seconds between frame-rate reports.
pub const ENV_FPS_TRACKING: &str = "DALI_FPS_TRACKING";
/// Frames between update-status log lines.
pub const ENV_UPDATE_STATUS_INTERVAL: &str = "DALI_UPDATE_STATUS_INTERVAL";
/// Prepared frames the update side may run ahead of rendering.
pub const ENV_MAX_UPDATE_COUNT: &str = "DALI_MAX_UPDATE_COUNT";
/// Initial vsync mode as a refresh count (0, 1, 2 or 4).
pub const ENV_VSYNC_MODE: &str = "DALI_VSYNC_MODE";
/// Log level for the adaptor threads.
pub const ENV_LOG_LEVEL: &str = "DALI_LOG_LEVEL";

/// Adaptor tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentOptions {
    /// Vsyncs per rendered frame. 1 renders every vsync.
    pub render_refresh_rate: u32,
    /// Seconds between frame-rate log lines. 0 disables tracking.
    pub fps_tracking_seconds: u32,
    /// Frames between update-status log lines. 0 disables logging.
    pub update_status_logging_frequency: u32,
    /// Prepared frames the update side may queue before it blocks.
    pub max_update_count: u32,
    /// Initial refresh synchronisation.
    pub sync_mode: SyncMode,
    /// Log level for the adaptor threads.
    pub log_level: String,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            render_refresh_rate: 1,
            fps_tracking_seconds: 0,
            update_status_logging_frequency: 0,
            max_update_count: 2,
            sync_mode: SyncMode::FullSync,
            log_level: "info".to_string(),
        }
    }
}

impl EnvironmentOptions {
    /// Reads the options from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_env() -> AdaptorResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the options through `lookup`, which maps a variable name to its value.
    ///
    /// Unset variables keep their defaults. A refresh rate below 1 is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> AdaptorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(rate) = parse_var::<u32, _>(&lookup, ENV_REFRESH_RATE)? {
            if rate >= 1 {
                options.render_refresh_rate = rate;
            }
        }
        if let Some(seconds) = parse_var(&lookup, ENV_FPS_TRACKING)? {
            options.fps_tracking_seconds = seconds;
        }
        if let Some(frequency) = parse_var(&lookup, ENV_UPDATE_STATUS_INTERVAL)? {
            options.update_status_logging_frequency = frequency;
        }
        if let Some(count) = parse_var(&lookup, ENV_MAX_UPDATE_COUNT)? {
            options.max_update_count = count;
        }
        if let Some(refreshes) = parse_var::<u32, _>(&lookup, ENV_VSYNC_MODE)? {
            options.sync_mode = SyncMode::from_refreshes(refreshes).ok_or_else(|| {
                AdaptorError::InvalidEnvironmentVariable {
                    name: ENV_VSYNC_MODE,
                    value: refreshes.to_string(),
                }
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            options.log_level = level;
        }

        options.validate()?;
        Ok(options)
    }

    /// Parses options from TOML. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for these options or a
    /// value is out of range.
    pub fn from_toml_str(text: &str) -> AdaptorResult<Self> {
        let options: Self = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> AdaptorResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AdaptorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`AdaptorError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> AdaptorResult<()> {
        if self.render_refresh_rate == 0 {
            return Err(AdaptorError::InvalidConfig(
                "render_refresh_rate must be at least 1".into(),
            ));
        }
        if self.max_update_count == 0 {
            return Err(AdaptorError::InvalidConfig(
                "max_update_count must be at least 1".into(),
            ));
        }
        self.level_filter()?;
        Ok(())
    }

    /// The configured log level.
    ///
    /// # Errors
    ///
    /// Returns [`AdaptorError::InvalidConfig`] if `log_level` is not a level name.
    pub fn level_filter(&self) -> AdaptorResult<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| AdaptorError::InvalidConfig(format!("unknown log level {:?}", self.log_level)))
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> AdaptorResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AdaptorError::InvalidEnvironmentVariable { name, value }),
    }
}
