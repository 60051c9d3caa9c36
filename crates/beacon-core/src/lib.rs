//! Client-side core of the beacon analytics SDK.
//!
//! This crate contains:
//! - Sessions: time-bounded session ids with inactivity rollover
//! - Envelopes: events stamped with session and environment metadata
//! - Flush scheduling: periodic transport flushes that never overlap
//! - The client tying these together over an [`EventTransport`]
//!
//! Delivery itself (batching, wire format, retries) belongs to the
//! transport implementation.

mod client;
pub mod envelope;
mod options;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use client::{Client, ClientError, PendingTracks};
pub use envelope::{EnvironmentInfo, EventEnvelope, Props, SDK_VERSION, SystemProps};
pub use options::{
    ClientOptions, DEBUG_FLUSH_INTERVAL, DEFAULT_TRACK_QUEUE_CAPACITY, MAX_FLUSH_INTERVAL,
    MIN_FLUSH_INTERVAL, RELEASE_FLUSH_INTERVAL,
};
pub use scheduler::{FlushScheduler, SchedulerStats};
pub use session::{SESSION_TIMEOUT, SessionId, SessionManager};
pub use transport::{EventTransport, MemoryTransport, TransportError};
