//! Transport that prints flushed envelopes as JSON lines.

use std::io::{self, Stdout, Write};

use beacon_core::{EventEnvelope, EventTransport, TransportError};
use tokio::sync::Mutex;

/// Buffers envelopes and writes one JSON object per line on flush.
#[derive(Debug)]
pub struct JsonLinesTransport<W> {
    buffer: Mutex<Vec<EventEnvelope>>,
    out: Mutex<W>,
}

impl JsonLinesTransport<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W> JsonLinesTransport<W> {
    pub fn new(out: W) -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            out: Mutex::new(out),
        }
    }

    /// Consumes the transport, returning the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send + 'static> EventTransport for JsonLinesTransport<W> {
    async fn enqueue(&self, envelope: EventEnvelope) {
        self.buffer.lock().await.push(envelope);
    }

    async fn flush(&self) -> Result<(), TransportError> {
        let batch = std::mem::take(&mut *self.buffer.lock().await);
        if batch.is_empty() {
            return Ok(());
        }

        let mut lines = String::new();
        for envelope in &batch {
            let line = serde_json::to_string(envelope).map_err(|err| TransportError::Delivery {
                message: err.to_string(),
            })?;
            lines.push_str(&line);
            lines.push('\n');
        }

        let mut out = self.out.lock().await;
        out.write_all(lines.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|err| TransportError::Delivery {
                message: err.to_string(),
            })?;
        tracing::debug!(count = batch.len(), "wrote envelopes");
        Ok(())
    }
}
