//! Environment snapshot for the host process.

use beacon_core::EnvironmentInfo;

use crate::Config;

/// Kernel release as exposed by procfs.
const OS_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";

/// Builds the environment snapshot stamped on every event.
pub fn collect(config: &Config) -> EnvironmentInfo {
    let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| normalize_locale(&value))
        .unwrap_or_default();

    EnvironmentInfo {
        is_debug: config.debug,
        locale,
        os_name: std::env::consts::OS.to_string(),
        os_version: os_version(),
        app_version: config.app_version.clone(),
        app_build_number: config.app_build_number.clone(),
        device_model: std::env::consts::ARCH.to_string(),
    }
}

/// Converts a POSIX locale (`en_US.UTF-8@euro`) to a language tag (`en-US`).
///
/// Returns `None` for empty values and the `C`/`POSIX` locales.
pub fn normalize_locale(value: &str) -> Option<String> {
    let tag = value
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        return None;
    }
    Some(tag.replace('_', "-"))
}

fn os_version() -> String {
    match std::fs::read_to_string(OS_RELEASE_PATH) {
        Ok(release) => release.trim().to_string(),
        Err(err) => {
            tracing::debug!(error = %err, "os release unavailable");
            String::new()
        }
    }
}
