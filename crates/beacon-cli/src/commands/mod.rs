//! CLI subcommand implementations.

pub mod heartbeat;
pub mod session;
pub mod track;
pub mod util;
