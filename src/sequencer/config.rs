/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Construction-time configuration for the reordering buffer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default number of out-of-order events held at once.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024;

/// Default staleness window before a held event is forced through.
pub const DEFAULT_MAX_WAIT_TIME: Duration = Duration::from_secs(5);

/// Errors raised while building a [`SequencerConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_buffer_size` must be at least 1.
    #[error("max_buffer_size must be positive")]
    ZeroBufferSize,

    /// `max_wait_time` must be non-zero.
    #[error("max_wait_time must be positive")]
    ZeroWaitTime,

    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for environment variable {key}")]
    InvalidEnv {
        /// The variable name.
        key: &'static str,
        /// The raw value found.
        value: String,
    },
}

/// Configuration of a [`ReorderBuffer`](super::ReorderBuffer).
///
/// # Examples
///
/// ```
/// use reorder_rs::SequencerConfig;
/// use std::time::Duration;
///
/// let config = SequencerConfig::default()
///     .with_max_buffer_size(64)
///     .with_max_wait_time(Duration::from_millis(250));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Cursor value a fresh or reset buffer starts from.
    pub origin: u64,

    /// Capacity bound on held (out-of-order) events.
    pub max_buffer_size: usize,

    /// Staleness window after which a held event is forced through.
    #[serde(rename = "max_wait_ms", with = "duration_ms")]
    pub max_wait_time: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            origin: 0,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            max_wait_time: DEFAULT_MAX_WAIT_TIME,
        }
    }
}

impl SequencerConfig {
    /// Creates a config with the given bounds and origin 0.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either bound is zero.
    pub fn new(max_buffer_size: usize, max_wait_time: Duration) -> Result<Self, ConfigError> {
        let config = Self {
            origin: 0,
            max_buffer_size,
            max_wait_time,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the cursor origin.
    #[must_use]
    pub fn with_origin(mut self, origin: u64) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the capacity bound on held events.
    #[must_use]
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Sets the staleness window.
    #[must_use]
    pub fn with_max_wait_time(mut self, max_wait_time: Duration) -> Self {
        self.max_wait_time = max_wait_time;
        self
    }

    /// Checks that both bounds are positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroBufferSize`] or [`ConfigError::ZeroWaitTime`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.max_wait_time.is_zero() {
            return Err(ConfigError::ZeroWaitTime);
        }
        Ok(())
    }

    /// Loads configuration from environment variables, falling back to
    /// defaults for unset ones.
    ///
    /// - `REORDER_ORIGIN`
    /// - `REORDER_MAX_BUFFER_SIZE`
    /// - `REORDER_MAX_WAIT_MS`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparsable values, or a
    /// validation error for zero bounds.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            origin: env_or("REORDER_ORIGIN", defaults.origin)?,
            max_buffer_size: env_or("REORDER_MAX_BUFFER_SIZE", defaults.max_buffer_size)?,
            max_wait_time: Duration::from_millis(env_or(
                "REORDER_MAX_WAIT_MS",
                u64::try_from(defaults.max_wait_time.as_millis()).unwrap_or(u64::MAX),
            )?),
        };
        config.validate()?;
        Ok(config)
    }
}

fn env_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        Err(_) => Ok(default),
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
