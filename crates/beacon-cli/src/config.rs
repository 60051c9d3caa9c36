//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use beacon_core::{ClientOptions, DEFAULT_TRACK_QUEUE_CAPACITY};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Collector used when none is configured.
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application key issued by the collector.
    pub app_key: String,
    /// Collector base URL.
    pub base_url: String,
    /// Report events as coming from a debug build.
    pub debug: bool,
    /// Seconds between scheduled flushes; defaults by `debug`.
    pub flush_interval_secs: Option<f64>,
    /// Bound on fire-and-forget events awaiting the transport.
    pub track_queue_capacity: usize,
    pub app_version: String,
    pub app_build_number: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("debug", &self.debug)
            .field("flush_interval_secs", &self.flush_interval_secs)
            .field("track_queue_capacity", &self.track_queue_capacity)
            .field("app_version", &self.app_version)
            .field("app_build_number", &self.app_build_number)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            debug: cfg!(debug_assertions),
            flush_interval_secs: None,
            track_queue_capacity: DEFAULT_TRACK_QUEUE_CAPACITY,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            app_build_number: String::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (BEACON_*)
        figment = figment.merge(Env::prefixed("BEACON_"));

        figment.extract()
    }

    /// Client options derived from this configuration.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            flush_interval_secs: self.flush_interval_secs,
            track_queue_capacity: self.track_queue_capacity,
        }
    }
}

/// Returns the platform-specific config directory for beacon.
///
/// On Linux: `~/.config/beacon`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("beacon"))
}
