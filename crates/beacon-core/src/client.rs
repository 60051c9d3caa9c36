//! The tracking client: sessions, envelopes, and flush lifecycle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::envelope::{EnvironmentInfo, EventEnvelope, Props, SystemProps};
use crate::options::ClientOptions;
use crate::scheduler::{FlushScheduler, SchedulerStats, flush_logged};
use crate::session::{SessionId, SessionManager};
use crate::transport::EventTransport;

/// Construction errors. Nothing after construction reports an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    /// The application key was unusable.
    #[error("invalid app key: {reason}")]
    InvalidAppKey { reason: &'static str },
    /// The collector base URL was unusable.
    #[error("invalid base URL: {reason}")]
    InvalidBaseUrl { reason: &'static str },
    /// The flush interval was outside 0.001 to 86400 seconds.
    #[error("flush interval must be between 0.001 and 86400 seconds, got {value}")]
    InvalidFlushInterval { value: f64 },
    /// The track queue needs room for at least one event.
    #[error("track queue capacity must be at least 1")]
    InvalidQueueCapacity,
    /// The client was built outside a tokio runtime.
    #[error("client must be created inside a tokio runtime")]
    NoRuntime,
}

/// What [`Client::shutdown`] does with fire-and-forget tracks that have not
/// reached the transport yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTracks {
    /// Hand every queued event to the transport before the final flush.
    Drain,
    /// Discard queued events.
    Abandon,
}

struct TrackQueue {
    tx: mpsc::Sender<EventEnvelope>,
    worker: JoinHandle<()>,
}

/// Analytics client.
///
/// Tracking never fails and never blocks on delivery: events are stamped
/// with the current session and environment and handed to the transport,
/// which owns everything after that.
///
/// # Thread Safety
///
/// The client is `Sync`; share it behind an `Arc`. Session touch-and-rollover
/// happens under a single lock, so events are attributed to sessions in
/// call order.
pub struct Client<T: EventTransport> {
    app_key: String,
    base_url: String,
    system_props: SystemProps,
    transport: Arc<T>,
    sessions: Mutex<SessionManager>,
    scheduler: FlushScheduler<T>,
    queue: Mutex<Option<TrackQueue>>,
    closed: AtomicBool,
}

impl<T: EventTransport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("app_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("flush_interval", &self.scheduler.interval())
            .finish_non_exhaustive()
    }
}

impl<T: EventTransport> Client<T> {
    /// Creates a client delivering through `transport`.
    ///
    /// Must be called inside a tokio runtime; timer and queue tasks run on
    /// it. Polling is not started.
    ///
    /// # Errors
    ///
    /// Returns an error if the app key or base URL is empty, the options
    /// are invalid, or there is no current runtime.
    pub fn new(
        app_key: impl Into<String>,
        base_url: impl Into<String>,
        env: &EnvironmentInfo,
        options: &ClientOptions,
        transport: T,
    ) -> Result<Self, ClientError> {
        let app_key = app_key.into();
        let base_url = base_url.into();

        if app_key.is_empty() {
            return Err(ClientError::InvalidAppKey {
                reason: "app key cannot be empty",
            });
        }
        if app_key.trim().is_empty() {
            return Err(ClientError::InvalidAppKey {
                reason: "app key cannot be whitespace-only",
            });
        }
        if base_url.trim().is_empty() {
            return Err(ClientError::InvalidBaseUrl {
                reason: "base URL cannot be empty",
            });
        }

        let interval = options.flush_interval(env.is_debug)?;
        if options.track_queue_capacity == 0 {
            return Err(ClientError::InvalidQueueCapacity);
        }
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let transport = Arc::new(transport);
        let (tx, rx) = mpsc::channel(options.track_queue_capacity);
        let worker = runtime.spawn(forward_tracks(Arc::clone(&transport), rx));
        let scheduler = FlushScheduler::new(Arc::clone(&transport), interval, runtime);

        tracing::info!(
            base_url = %base_url,
            interval_ms = interval.as_millis(),
            debug = env.is_debug,
            "analytics client created"
        );

        Ok(Self {
            app_key,
            base_url,
            system_props: SystemProps::from_environment(env),
            transport,
            sessions: Mutex::new(SessionManager::new(Utc::now())),
            scheduler,
            queue: Mutex::new(Some(TrackQueue { tx, worker })),
            closed: AtomicBool::new(false),
        })
    }

    /// Tracks an event without waiting.
    ///
    /// The session is touched and the envelope built before returning; the
    /// hand-off to the transport happens on a background task. If the
    /// background queue is full or the client has shut down, the event is
    /// dropped and a warning logged.
    pub fn track(&self, event_name: impl Into<String>, props: Props) {
        let envelope = self.envelope_at(Utc::now(), event_name.into(), props);

        let queue = self.queue.lock();
        let Some(queue) = queue.as_ref() else {
            tracing::warn!(
                event = envelope.event_name(),
                "client shut down, dropping event"
            );
            return;
        };
        let (envelope, reason) = match queue.tx.try_send(envelope) {
            Ok(()) => return,
            Err(TrySendError::Full(envelope)) => (envelope, "track queue full"),
            Err(TrySendError::Closed(envelope)) => (envelope, "track queue closed"),
        };
        tracing::warn!(event = envelope.event_name(), reason, "dropping event");
    }

    /// Tracks an event, resolving once the transport has accepted it.
    pub async fn track_async(&self, event_name: impl Into<String>, props: Props) {
        let envelope = self.envelope_at(Utc::now(), event_name.into(), props);
        self.transport.enqueue(envelope).await;
    }

    fn envelope_at(&self, now: DateTime<Utc>, event_name: String, props: Props) -> EventEnvelope {
        let session_id = self.sessions.lock().touch(now);
        EventEnvelope::new(now, session_id, event_name, self.system_props.clone(), props)
    }

    /// Starts periodic flushing, restarting the timer if already running.
    ///
    /// Does nothing once [`Client::shutdown`] has been called.
    pub fn start_polling(&self) {
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!("client is shut down, not starting polling");
            return;
        }
        self.scheduler.start();
        // Lost a race with shutdown; its disarm may have run before our start.
        if self.closed.load(Ordering::Acquire) {
            self.scheduler.disarm();
        }
    }

    /// Stops periodic flushing and triggers a final flush in the background.
    pub fn stop_polling(&self) {
        self.scheduler.stop();
    }

    /// Flushes the transport now and waits for it to finish.
    pub async fn flush(&self) {
        flush_logged(self.transport.as_ref(), "manual").await;
    }

    /// Shuts the client down and waits for a final flush.
    ///
    /// Unlike [`Client::stop_polling`], this waits: it disarms the timer,
    /// drains or abandons queued fire-and-forget tracks, then flushes. Later
    /// `track` calls are dropped and polling cannot be restarted.
    pub async fn shutdown(&self, pending: PendingTracks) {
        self.closed.store(true, Ordering::Release);
        self.scheduler.disarm();

        let queue = self.queue.lock().take();
        if let Some(TrackQueue { tx, worker }) = queue {
            let queued = tx.max_capacity() - tx.capacity();
            drop(tx);
            match pending {
                PendingTracks::Drain => {
                    if let Err(err) = worker.await {
                        tracing::warn!(error = %err, "track worker failed while draining");
                    }
                }
                PendingTracks::Abandon => {
                    worker.abort();
                    let _ = worker.await;
                    if queued > 0 {
                        tracing::warn!(queued, "abandoned queued events at shutdown");
                    }
                }
            }
        }

        flush_logged(self.transport.as_ref(), "shutdown").await;
        tracing::info!("analytics client shut down");
    }

    /// The current session, without recording activity.
    pub fn session_id(&self) -> SessionId {
        self.sessions.lock().current()
    }

    pub const fn flush_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn system_props(&self) -> &SystemProps {
        &self.system_props
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

async fn forward_tracks<T: EventTransport>(
    transport: Arc<T>,
    mut rx: mpsc::Receiver<EventEnvelope>,
) {
    while let Some(envelope) = rx.recv().await {
        transport.enqueue(envelope).await;
    }
    tracing::debug!("track queue closed");
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;
    use crate::transport::MemoryTransport;

    fn environment() -> EnvironmentInfo {
        EnvironmentInfo {
            is_debug: false,
            locale: "de-DE".to_string(),
            os_name: "linux".to_string(),
            os_version: "6.8.0".to_string(),
            app_version: "2.0.0".to_string(),
            app_build_number: "200".to_string(),
            device_model: "aarch64".to_string(),
        }
    }

    fn client(options: &ClientOptions) -> Client<MemoryTransport> {
        Client::new(
            "A-DEV-0000000000",
            "http://localhost:3000",
            &environment(),
            options,
            MemoryTransport::new(),
        )
        .unwrap()
    }

    fn props(value: serde_json::Value) -> Props {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn rejects_empty_app_key() {
        let result = Client::new(
            "",
            "http://localhost",
            &environment(),
            &ClientOptions::default(),
            MemoryTransport::new(),
        );
        assert!(matches!(result, Err(ClientError::InvalidAppKey { .. })));
    }

    #[tokio::test]
    async fn rejects_whitespace_app_key() {
        let result = Client::new(
            "   ",
            "http://localhost",
            &environment(),
            &ClientOptions::default(),
            MemoryTransport::new(),
        );
        assert!(matches!(result, Err(ClientError::InvalidAppKey { .. })));
    }

    #[tokio::test]
    async fn rejects_empty_base_url() {
        let result = Client::new(
            "A-DEV-0000000000",
            " ",
            &environment(),
            &ClientOptions::default(),
            MemoryTransport::new(),
        );
        assert!(matches!(result, Err(ClientError::InvalidBaseUrl { .. })));
    }

    #[tokio::test]
    async fn rejects_zero_queue_capacity() {
        let options = ClientOptions {
            track_queue_capacity: 0,
            ..ClientOptions::default()
        };
        let result = Client::new(
            "A-DEV-0000000000",
            "http://localhost",
            &environment(),
            &options,
            MemoryTransport::new(),
        );
        assert!(matches!(result, Err(ClientError::InvalidQueueCapacity)));
    }

    #[test]
    fn requires_runtime() {
        let result = Client::new(
            "A-DEV-0000000000",
            "http://localhost",
            &environment(),
            &ClientOptions::default(),
            MemoryTransport::new(),
        );
        assert!(matches!(result, Err(ClientError::NoRuntime)));
    }

    #[tokio::test]
    async fn debug_redacts_app_key() {
        let client = client(&ClientOptions::default());
        let debug = format!("{client:?}");
        assert!(!debug.contains("A-DEV-0000000000"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn interval_follows_debug_flag() {
        let release = client(&ClientOptions::default());
        assert_eq!(release.flush_interval(), Duration::from_secs(60));

        let debug = Client::new(
            "A-DEV-0000000000",
            "http://localhost",
            &EnvironmentInfo {
                is_debug: true,
                ..environment()
            },
            &ClientOptions::default(),
            MemoryTransport::new(),
        )
        .unwrap();
        assert_eq!(debug.flush_interval(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn track_async_builds_full_envelope() {
        let client = client(&ClientOptions::default());
        client
            .track_async("purchase", props(json!({"amount": 9.99, "items": ["a"]})))
            .await;

        let pending = client.transport().pending();
        assert_eq!(pending.len(), 1);
        let envelope = &pending[0];
        assert_eq!(envelope.event_name(), "purchase");
        assert_eq!(envelope.session_id(), client.session_id());
        assert_eq!(envelope.props()["amount"], json!(9.99));
        assert_eq!(envelope.system_props().locale, "de-DE");
        assert_eq!(envelope.system_props().app_build_number, "200");
        assert_eq!(envelope.system_props().sdk_version, crate::SDK_VERSION);
    }

    #[tokio::test]
    async fn envelopes_share_session_within_timeout() {
        let client = client(&ClientOptions::default());
        let start = Utc::now();
        let first = client.envelope_at(start, "a".to_string(), Props::new());
        let second = client.envelope_at(
            start + TimeDelta::minutes(59),
            "b".to_string(),
            Props::new(),
        );
        assert_eq!(first.session_id(), second.session_id());
    }

    #[tokio::test]
    async fn envelopes_split_sessions_after_timeout() {
        let client = client(&ClientOptions::default());
        let start = Utc::now();
        let first = client.envelope_at(start, "a".to_string(), Props::new());
        let later = start + TimeDelta::seconds(3601);
        let second = client.envelope_at(later, "b".to_string(), Props::new());

        assert_ne!(first.session_id(), second.session_id());
        assert_eq!(
            second.session_id().epoch_seconds(),
            u64::try_from(later.timestamp()).unwrap()
        );
        assert_eq!(second.timestamp(), later);
    }

    #[tokio::test]
    async fn fire_and_forget_track_reaches_transport() {
        let client = client(&ClientOptions::default());
        client.track("app_started", Props::new());
        client.shutdown(PendingTracks::Drain).await;

        let delivered = client.transport().delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].event_name(), "app_started");
    }

    #[tokio::test]
    async fn full_queue_drops_events_without_blocking() {
        let options = ClientOptions {
            track_queue_capacity: 1,
            ..ClientOptions::default()
        };
        let client = client(&options);

        // The worker has not run yet on this single-threaded runtime.
        for i in 0..5 {
            client.track(format!("event_{i}"), Props::new());
        }
        client.shutdown(PendingTracks::Drain).await;

        assert_eq!(client.transport().enqueued_count(), 1);
    }

    #[tokio::test]
    async fn abandon_discards_queued_tracks() {
        let client = client(&ClientOptions::default());
        client.track("queued", Props::new());
        client.shutdown(PendingTracks::Abandon).await;

        assert_eq!(client.transport().enqueued_count(), 0);
        assert_eq!(client.transport().flush_calls(), 1);
    }

    #[tokio::test]
    async fn track_after_shutdown_is_dropped() {
        let client = client(&ClientOptions::default());
        client.shutdown(PendingTracks::Drain).await;

        client.track("late", Props::new());
        tokio::task::yield_now().await;

        assert_eq!(client.transport().enqueued_count(), 0);
    }

    #[tokio::test]
    async fn flush_swallows_transport_failure() {
        let client = client(&ClientOptions::default());
        client.transport().set_failing(true);
        client.track_async("a", Props::new()).await;

        client.flush().await;

        assert_eq!(client.transport().flush_calls(), 1);
        assert_eq!(client.transport().pending().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_polling_without_extra_flush() {
        let client = client(&ClientOptions::default().with_flush_interval_secs(1.0));
        client.start_polling();
        assert!(client.is_polling());

        client.shutdown(PendingTracks::Drain).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!client.is_polling());
        assert_eq!(client.transport().flush_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_cannot_restart_after_shutdown() {
        let client = client(&ClientOptions::default().with_flush_interval_secs(1.0));
        client.shutdown(PendingTracks::Drain).await;

        client.start_polling();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!client.is_polling());
        assert_eq!(client.transport().flush_calls(), 1);
        assert_eq!(client.scheduler_stats().ticks, 0);
    }
}
