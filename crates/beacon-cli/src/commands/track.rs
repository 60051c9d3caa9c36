//! Track command for sending a single event.

use anyhow::Result;
use beacon_core::PendingTracks;

use crate::Config;
use crate::commands::util::{build_client, parse_props};

/// Tracks one event and waits until it has been flushed.
pub async fn run(config: &Config, event: &str, pairs: &[String]) -> Result<()> {
    let props = parse_props(pairs)?;
    let client = build_client(config)?;

    client.track_async(event, props).await;
    tracing::debug!(session = %client.session_id(), event, "event tracked");

    client.shutdown(PendingTracks::Drain).await;
    Ok(())
}
