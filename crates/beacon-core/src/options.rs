//! Client tuning options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ClientError;

/// Flush interval for debug builds, short so events show up quickly.
pub const DEBUG_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// Flush interval for release builds.
pub const RELEASE_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest explicit flush interval accepted.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

/// Longest explicit flush interval accepted.
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default bound on fire-and-forget tracks waiting for the transport.
pub const DEFAULT_TRACK_QUEUE_CAPACITY: usize = 1024;

/// Optional knobs supplied at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Seconds between scheduled flushes, from 0.001 to 86400. Defaults by
    /// build flavor.
    pub flush_interval_secs: Option<f64>,
    /// How many fire-and-forget tracks may wait for the transport.
    pub track_queue_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            flush_interval_secs: None,
            track_queue_capacity: DEFAULT_TRACK_QUEUE_CAPACITY,
        }
    }
}

impl ClientOptions {
    /// Sets the flush interval in seconds.
    #[must_use]
    pub const fn with_flush_interval_secs(mut self, secs: f64) -> Self {
        self.flush_interval_secs = Some(secs);
        self
    }

    /// Resolves the effective flush interval.
    ///
    /// An explicit interval must lie within [`MIN_FLUSH_INTERVAL`] and
    /// [`MAX_FLUSH_INTERVAL`].
    pub fn flush_interval(&self, is_debug: bool) -> Result<Duration, ClientError> {
        let Some(secs) = self.flush_interval_secs else {
            return Ok(if is_debug {
                DEBUG_FLUSH_INTERVAL
            } else {
                RELEASE_FLUSH_INTERVAL
            });
        };

        match Duration::try_from_secs_f64(secs) {
            Ok(interval) if (MIN_FLUSH_INTERVAL..=MAX_FLUSH_INTERVAL).contains(&interval) => {
                Ok(interval)
            }
            _ => Err(ClientError::InvalidFlushInterval { value: secs }),
        }
    }
}
