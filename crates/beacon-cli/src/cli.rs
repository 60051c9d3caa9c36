//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Beacon analytics client.
///
/// Tracks events with session and environment metadata and prints each
/// flushed envelope as a JSON line.
#[derive(Debug, Parser)]
#[command(name = "beacon", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track a single event and flush it.
    Track {
        /// The event name.
        event: String,

        /// Event property as key=value. Values that parse as JSON keep
        /// their type; anything else is a string.
        #[arg(short, long = "prop", value_name = "KEY=VALUE")]
        props: Vec<String>,
    },

    /// Emit heartbeat events while periodic flushing runs.
    Heartbeat {
        /// Number of heartbeats to send.
        #[arg(long, default_value_t = 3)]
        count: u32,

        /// Seconds between heartbeats.
        #[arg(long, default_value_t = 1.0)]
        every: f64,
    },

    /// Mint a session id and show what it encodes.
    Session,
}
