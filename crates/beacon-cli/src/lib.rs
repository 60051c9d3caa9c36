//! Beacon analytics CLI library.
//!
//! This crate provides the command-line front end for the beacon client.

mod cli;
pub mod commands;
mod config;
pub mod environment;
pub mod transport;

pub use cli::{Cli, Commands};
pub use config::Config;
