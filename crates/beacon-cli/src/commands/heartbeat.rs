//! Heartbeat command exercising periodic flushing.

use std::time::Duration;

use anyhow::{Context, Result};
use beacon_core::{PendingTracks, Props};

use crate::Config;
use crate::commands::util::build_client;

/// Sends `count` heartbeat events, `every` seconds apart, with polling on.
pub async fn run(config: &Config, count: u32, every: f64) -> Result<()> {
    let pause = Duration::try_from_secs_f64(every)
        .with_context(|| format!("invalid heartbeat interval: {every}"))?;
    let client = build_client(config)?;
    client.start_polling();

    for beat in 1..=count {
        let mut props = Props::new();
        props.insert("beat".to_string(), beat.into());
        client.track("heartbeat", props);
        if beat < count {
            tokio::time::sleep(pause).await;
        }
    }

    let stats = client.scheduler_stats();
    tracing::debug!(ticks = stats.ticks, skipped = stats.skipped, "heartbeats sent");

    client.shutdown(PendingTracks::Drain).await;
    Ok(())
}
