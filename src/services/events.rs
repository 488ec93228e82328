use crate::metrics::Metrics;
use crate::models::PendingEvent;
use crate::remote::{RemoteClient, RemoteError};
use crate::state::{ConfigurationGate, StateChange};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of a single [`EventBuffer::flush`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered
    Empty,
    /// Another flush was still waiting on the webstore
    Skipped,
    /// The webstore accepted the batch and its events were removed
    Delivered { count: usize },
    /// The batch was rejected or the request failed; nothing was removed
    Failed(RemoteError),
}

/// Buffered event tagged with the identity used to remove it after delivery
#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    event: PendingEvent,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    next_id: u64,
}

/// Defensive copy of the oldest buffered events
#[derive(Debug)]
struct Batch {
    ids: HashSet<u64>,
    events: Vec<PendingEvent>,
}

/// Clears the in-flight flag when the flush completes or its future is dropped
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Unbounded in-memory buffer of events awaiting delivery
///
/// Delivery is at-least-once: a flush copies up to `batch_size` of the oldest
/// events, submits the copy, and only after the webstore accepts it removes
/// exactly those events (matched by identity, since producers may append while
/// the request is in flight). A failed batch leaves the buffer untouched and the
/// same events go out again on the next flush. Only one flush runs at a time.
pub struct EventBuffer {
    inner: Mutex<Inner>,
    in_flight: AtomicBool,
    batch_size: usize,
    remote: Arc<dyn RemoteClient>,
    state: Arc<ConfigurationGate>,
    metrics: Arc<Metrics>,
}

impl EventBuffer {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        state: Arc<ConfigurationGate>,
        metrics: Arc<Metrics>,
        batch_size: usize,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            in_flight: AtomicBool::new(false),
            batch_size: batch_size.max(1),
            remote,
            state,
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffer an event. Never blocks on the network.
    pub fn append(&self, event: PendingEvent) {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(Entry { id, event });
        drop(inner);

        self.metrics.record_event_appended();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether a flush is currently waiting on the webstore
    pub fn is_flushing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Copy of every buffered event, oldest first
    pub fn pending(&self) -> Vec<PendingEvent> {
        self.lock().entries.iter().map(|e| e.event.clone()).collect()
    }

    /// Submit the oldest buffered events as one batch
    pub async fn flush(&self) -> FlushOutcome {
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            self.metrics.record_flush_skipped();
            tracing::debug!("Event flush still in flight, skipping");
            return FlushOutcome::Skipped;
        };

        let Some(batch) = self.take_batch() else {
            return FlushOutcome::Empty;
        };

        let Batch { ids, events } = batch;
        let size = events.len();

        match self.remote.submit_event_batch(events).await {
            Ok(()) => {
                let removed = self.remove_delivered(&ids);
                self.metrics.record_events_delivered(removed);
                self.state
                    .notify(StateChange::EventsDelivered { count: removed });
                tracing::debug!("Successfully sent {} join events", removed);
                FlushOutcome::Delivered { count: removed }
            }
            Err(e) => {
                self.metrics.record_batch_failed();
                tracing::error!("Failed to send {} join events: {}", size, e);
                FlushOutcome::Failed(e)
            }
        }
    }

    fn take_batch(&self) -> Option<Batch> {
        let inner = self.lock();
        if inner.entries.is_empty() {
            return None;
        }

        let take = inner.entries.len().min(self.batch_size);
        let mut ids = HashSet::with_capacity(take);
        let mut events = Vec::with_capacity(take);
        for entry in &inner.entries[..take] {
            ids.insert(entry.id);
            events.push(entry.event.clone());
        }

        Some(Batch { ids, events })
    }

    fn remove_delivered(&self, ids: &HashSet<u64>) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|entry| !ids.contains(&entry.id));
        before - inner.entries.len()
    }
}
