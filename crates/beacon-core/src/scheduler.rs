//! Periodic transport flushing with overlap prevention.
//!
//! A running scheduler owns one timer task. Every tick tries to claim the
//! in-flight flag with a compare-and-set; if a flush it started earlier is
//! still running the tick is dropped, so a slow transport sees at most one
//! scheduler-driven flush at a time.
//!
//! A flush that never resolves keeps the flag claimed and silently
//! suppresses every later scheduled flush until it does. No timeout is
//! imposed here; bounding flush time is the transport's job.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::options::{MAX_FLUSH_INTERVAL, MIN_FLUSH_INTERVAL};
use crate::transport::EventTransport;

/// Counters describing what the timer has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Timer ticks observed.
    pub ticks: u64,
    /// Ticks dropped because a scheduled flush was still in flight.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    skipped: AtomicU64,
}

/// Clears the in-flight flag when the flush task ends, however it ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives `flush` on a transport at a fixed interval.
///
/// Stopped on creation. Dropping a running scheduler stops it, including
/// the final flush.
pub struct FlushScheduler<T: EventTransport> {
    transport: Arc<T>,
    interval: Duration,
    runtime: Handle,
    in_flight: Arc<AtomicBool>,
    counters: Arc<Counters>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<T: EventTransport> FlushScheduler<T> {
    /// Creates a stopped scheduler whose tasks run on `runtime`.
    ///
    /// `interval` is clamped to [`MIN_FLUSH_INTERVAL`]..=[`MAX_FLUSH_INTERVAL`].
    pub fn new(transport: Arc<T>, interval: Duration, runtime: Handle) -> Self {
        Self {
            transport,
            interval: interval.clamp(MIN_FLUSH_INTERVAL, MAX_FLUSH_INTERVAL),
            runtime,
            in_flight: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            timer: Mutex::new(None),
        }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the timer is armed.
    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Whether a scheduler-driven flush is currently running.
    pub fn flush_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Arms the timer, replacing any timer already running.
    ///
    /// Replacing a timer does not flush. The first tick fires one interval
    /// after this call.
    pub fn start(&self) {
        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
            tracing::debug!("replacing running flush timer");
        }

        let task = run_timer(
            Arc::clone(&self.transport),
            self.interval,
            Arc::clone(&self.in_flight),
            Arc::clone(&self.counters),
        );
        *timer = Some(self.runtime.spawn(task));
        tracing::debug!(interval_ms = self.interval.as_millis(), "flush timer started");
    }

    /// Disarms the timer and triggers one final flush.
    ///
    /// Safe to call when not running. The final flush ignores the in-flight
    /// flag and may overlap a scheduled flush. It runs in the background;
    /// this method does not wait for it.
    pub fn stop(&self) {
        self.disarm();
        self.spawn_final_flush();
    }

    /// Disarms the timer without flushing. Returns whether it was armed.
    pub(crate) fn disarm(&self) -> bool {
        let Some(task) = self.timer.lock().take() else {
            return false;
        };
        task.abort();
        tracing::debug!("flush timer stopped");
        true
    }

    fn spawn_final_flush(&self) {
        let transport = Arc::clone(&self.transport);
        self.runtime.spawn(async move {
            flush_logged(transport.as_ref(), "final").await;
        });
    }
}

impl<T: EventTransport> Drop for FlushScheduler<T> {
    fn drop(&mut self) {
        if self.disarm() {
            self.spawn_final_flush();
        }
    }
}

async fn run_timer<T: EventTransport>(
    transport: Arc<T>,
    interval: Duration,
    in_flight: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    let now = Instant::now();
    let first = now.checked_add(interval).unwrap_or(now);
    let mut ticker = tokio::time::interval_at(first, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        counters.ticks.fetch_add(1, Ordering::Relaxed);

        if in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("scheduled flush still in flight, skipping tick");
            continue;
        }

        let guard = InFlight(Arc::clone(&in_flight));
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let _guard = guard;
            flush_logged(transport.as_ref(), "scheduled").await;
        });
    }
}

/// Runs a transport flush, logging failure instead of returning it.
pub(crate) async fn flush_logged<T: EventTransport>(transport: &T, trigger: &'static str) {
    match transport.flush().await {
        Ok(()) => tracing::debug!(trigger, "flush completed"),
        Err(err) => tracing::warn!(trigger, error = %err, "flush failed"),
    }
}
