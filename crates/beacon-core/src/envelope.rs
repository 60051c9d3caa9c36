//! Event envelopes handed to the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// SDK identifier stamped on every envelope.
pub const SDK_VERSION: &str = concat!("beacon-rust@", env!("CARGO_PKG_VERSION"));

/// Custom event properties: scalars, arrays, or nested objects.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// Static per-process metadata supplied by the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentInfo {
    /// Whether the host is a debug/development build.
    pub is_debug: bool,
    pub locale: String,
    pub os_name: String,
    pub os_version: String,
    pub app_version: String,
    pub app_build_number: String,
    pub device_model: String,
}

/// Environment metadata as it appears on an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProps {
    pub is_debug: bool,
    pub locale: String,
    pub os_name: String,
    pub os_version: String,
    pub app_version: String,
    pub app_build_number: String,
    pub sdk_version: String,
    pub device_model: String,
}

impl SystemProps {
    /// Captures the environment snapshot alongside [`SDK_VERSION`].
    pub fn from_environment(env: &EnvironmentInfo) -> Self {
        Self {
            is_debug: env.is_debug,
            locale: env.locale.clone(),
            os_name: env.os_name.clone(),
            os_version: env.os_version.clone(),
            app_version: env.app_version.clone(),
            app_build_number: env.app_build_number.clone(),
            sdk_version: SDK_VERSION.to_string(),
            device_model: env.device_model.clone(),
        }
    }
}

/// A fully assembled event ready for delivery.
///
/// Immutable once built. Ownership moves to the transport on enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    timestamp: DateTime<Utc>,
    session_id: SessionId,
    event_name: String,
    system_props: SystemProps,
    #[serde(default)]
    props: Props,
}

impl EventEnvelope {
    pub fn new(
        timestamp: DateTime<Utc>,
        session_id: SessionId,
        event_name: impl Into<String>,
        system_props: SystemProps,
        props: Props,
    ) -> Self {
        Self {
            timestamp,
            session_id,
            event_name: event_name.into(),
            system_props,
            props,
        }
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub const fn system_props(&self) -> &SystemProps {
        &self.system_props
    }

    pub const fn props(&self) -> &Props {
        &self.props
    }
}
