//! Client timeout configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::middleware::{
    build_stream_interceptor, build_unary_interceptor, StreamTimeoutLayer, UnaryTimeoutLayer,
};

/// Default timeouts applied by the client interceptors.
///
/// Values are signed milliseconds; zero or negative disables the bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default timeout for unary calls in milliseconds.
    pub unary_timeout_ms: i64,
    /// Default timeout for streams in milliseconds, covering the whole stream lifetime.
    pub stream_timeout_ms: i64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            unary_timeout_ms: 30_000,
            stream_timeout_ms: 0,
        }
    }
}

impl TimeoutConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when `raw` is not a valid config document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    #[must_use]
    pub fn unary_timeout(&self) -> Duration {
        millis_to_timeout(self.unary_timeout_ms)
    }

    #[must_use]
    pub fn stream_timeout(&self) -> Duration {
        millis_to_timeout(self.stream_timeout_ms)
    }

    #[must_use]
    pub fn unary_layer(&self) -> UnaryTimeoutLayer {
        build_unary_interceptor(self.unary_timeout())
    }

    #[must_use]
    pub fn stream_layer(&self) -> StreamTimeoutLayer {
        build_stream_interceptor(self.stream_timeout())
    }
}

fn millis_to_timeout(ms: i64) -> Duration {
    u64::try_from(ms).map_or(Duration::ZERO, Duration::from_millis)
}

/// Errors from loading a [`TimeoutConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout config: {0}")]
    Parse(#[from] serde_json::Error),
}
