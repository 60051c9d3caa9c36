//! Session command for inspecting session ids.

use std::io::Write;

use anyhow::{Context, Result};
use beacon_core::SessionId;
use chrono::{DateTime, Utc};

/// Mints a session id at `now` and writes it with its decoded parts.
pub fn run<W: Write>(writer: &mut W, now: DateTime<Utc>) -> Result<()> {
    let id = SessionId::generate(now);
    let seconds = i64::try_from(id.epoch_seconds()).context("session epoch out of range")?;
    let minted = DateTime::from_timestamp(seconds, 0).context("session epoch out of range")?;

    writeln!(writer, "Session ID: {id}")?;
    writeln!(writer, "Minted at:  {}", minted.to_rfc3339())?;
    writeln!(writer, "Suffix:     {:08}", id.suffix())?;
    Ok(())
}
