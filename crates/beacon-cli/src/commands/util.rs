//! Shared utilities for CLI commands.

use std::io::Stdout;

use anyhow::{Context, Result, bail};
use beacon_core::{Client, Props};

use crate::Config;
use crate::environment;
use crate::transport::JsonLinesTransport;

/// Client printing flushed envelopes to stdout.
pub type StdoutClient = Client<JsonLinesTransport<Stdout>>;

/// Builds a client from configuration and the current environment.
pub fn build_client(config: &Config) -> Result<StdoutClient> {
    let env = environment::collect(config);
    tracing::debug!(?env, "collected environment");

    Client::new(
        config.app_key.clone(),
        config.base_url.clone(),
        &env,
        &config.client_options(),
        JsonLinesTransport::stdout(),
    )
    .context("failed to create analytics client")
}

/// Parses `key=value` pairs into event properties.
///
/// Values that are valid JSON keep their JSON type (`3`, `true`,
/// `["a"]`, `{"k":1}`); anything else becomes a string. Later pairs
/// overwrite earlier ones with the same key.
pub fn parse_props(pairs: &[String]) -> Result<Props> {
    let mut props = Props::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("Invalid property: {pair}. Use key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid property: {pair}. Key cannot be empty");
        }
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        props.insert(key.to_string(), value);
    }
    Ok(props)
}
