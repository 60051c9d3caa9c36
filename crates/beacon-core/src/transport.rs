//! The delivery seam between the client and whatever ships envelopes.
//!
//! Batching, wire format, retries and persistence live behind
//! [`EventTransport`]. The client only hands envelopes over and asks for
//! flushes; it never inspects what happened to them afterwards.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::envelope::EventEnvelope;

/// Transport failures. Opaque to the client beyond being logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Envelopes could not be delivered.
    #[error("delivery failed: {message}")]
    Delivery { message: String },
    /// The transport cannot accept work right now.
    #[error("transport unavailable: {message}")]
    Unavailable { message: String },
}

/// Queueing dispatcher that delivers envelopes to a collector.
///
/// `enqueue` must return quickly; the caller is on the tracking path.
/// `flush` resolves once everything queued so far has been sent or has
/// definitively failed.
pub trait EventTransport: Send + Sync + 'static {
    /// Takes ownership of an envelope for later delivery.
    fn enqueue(&self, envelope: EventEnvelope) -> impl Future<Output = ()> + Send;

    /// Delivers all currently queued envelopes.
    fn flush(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Transport that keeps envelopes in memory.
///
/// Flushing moves pending envelopes to the delivered list. Flush latency and
/// failures can be simulated, and the number of concurrent flushes is
/// tracked so callers can check that flushes never overlap.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    pending: Mutex<Vec<EventEnvelope>>,
    delivered: Mutex<Vec<EventEnvelope>>,
    enqueued: AtomicU64,
    flush_calls: AtomicU64,
    active_flushes: AtomicUsize,
    peak_flushes: AtomicUsize,
    flush_latency: Duration,
    failing: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every flush take `latency` before completing.
    #[must_use]
    pub fn with_flush_latency(mut self, latency: Duration) -> Self {
        self.flush_latency = latency;
        self
    }

    /// When set, flushes fail and leave envelopes pending.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Envelopes waiting for the next successful flush.
    pub fn pending(&self) -> Vec<EventEnvelope> {
        self.pending.lock().clone()
    }

    /// Envelopes moved out by successful flushes, in enqueue order.
    pub fn delivered(&self) -> Vec<EventEnvelope> {
        self.delivered.lock().clone()
    }

    /// Total envelopes ever enqueued.
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::SeqCst)
    }

    /// Number of times `flush` has been invoked.
    pub fn flush_calls(&self) -> u64 {
        self.flush_calls.load(Ordering::SeqCst)
    }

    /// Highest number of flushes observed running at once.
    pub fn peak_concurrent_flushes(&self) -> usize {
        self.peak_flushes.load(Ordering::SeqCst)
    }
}

struct ActiveFlush<'a>(&'a AtomicUsize);

impl Drop for ActiveFlush<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EventTransport for MemoryTransport {
    async fn enqueue(&self, envelope: EventEnvelope) {
        self.enqueued.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().push(envelope);
    }

    async fn flush(&self) -> Result<(), TransportError> {
        self.flush_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active_flushes.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveFlush(&self.active_flushes);
        self.peak_flushes.fetch_max(active, Ordering::SeqCst);

        if !self.flush_latency.is_zero() {
            tokio::time::sleep(self.flush_latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Delivery {
                message: "simulated failure".to_string(),
            });
        }

        let batch = std::mem::take(&mut *self.pending.lock());
        tracing::debug!(count = batch.len(), "memory transport flushed envelopes");
        self.delivered.lock().extend(batch);
        Ok(())
    }
}
