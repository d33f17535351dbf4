//! # precept-notify
//!
//! Fan-out of [`DomainEvent`]s to live dashboard subscribers.
//!
//! One `tokio::sync::broadcast` channel exists per [`EntityKind`], so
//! delivery is FIFO within a kind and independent across kinds. Nothing is
//! retained: a subscriber only sees events published after it subscribed,
//! and a consumer that needs current state must re-fetch it after
//! subscribing rather than wait for a replay.

#![deny(unsafe_code)]

use precept_core::events::{DomainEvent, EntityKind};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::trace;

/// Default per-channel buffer size.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Why a [`Subscription::recv`] call returned no event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscriber fell behind and `missed` events were dropped for it.
    /// Receiving again resumes from the oldest retained event; the consumer
    /// should re-fetch current state instead of trusting its view.
    #[error("subscriber lagged, {missed} events missed")]
    Lagged {
        /// Number of events this subscriber missed.
        missed: u64,
    },

    /// The notifier was dropped; no further events will arrive.
    #[error("notifier closed")]
    Closed,
}

/// Publishes entity-change events to any number of subscribers.
///
/// Cheap to share: engines hold it behind an `Arc` and call
/// [`ChangeNotifier::publish`] after each committed mutation. Publishing
/// never blocks and never fails; with no live subscribers the event is
/// simply dropped.
#[derive(Debug)]
pub struct ChangeNotifier {
    assignments: broadcast::Sender<DomainEvent>,
    entries: broadcast::Sender<DomainEvent>,
    locks: broadcast::Sender<DomainEvent>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl ChangeNotifier {
    /// Create a notifier with the given per-channel buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (assignments, _) = broadcast::channel(capacity);
        let (entries, _) = broadcast::channel(capacity);
        let (locks, _) = broadcast::channel(capacity);
        Self {
            assignments,
            entries,
            locks,
        }
    }

    fn channel(&self, kind: EntityKind) -> &broadcast::Sender<DomainEvent> {
        match kind {
            EntityKind::Assignment => &self.assignments,
            EntityKind::ClinicalEntry => &self.entries,
            EntityKind::TermLock => &self.locks,
        }
    }

    /// Fan an event out to the subscribers of its kind. Returns how many
    /// subscribers were reached.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        let reached = self
            .channel(event.kind())
            .send(event.clone())
            .unwrap_or(0);
        trace!(
            event_type = event.event_type(),
            student_id = %event.student_id(),
            reached,
            "published change event"
        );
        reached
    }

    /// Subscribe to one entity kind. Events published before this call are
    /// not delivered.
    #[must_use]
    pub fn subscribe(&self, kind: EntityKind) -> Subscription {
        Subscription {
            kind,
            rx: self.channel(kind).subscribe(),
        }
    }

    /// Number of live subscribers for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EntityKind) -> usize {
        self.channel(kind).receiver_count()
    }
}

/// A live subscription to one entity kind's event stream.
///
/// Dropping the subscription (or calling [`Subscription::cancel`]) stops
/// delivery immediately.
#[derive(Debug)]
pub struct Subscription {
    kind: EntityKind,
    rx: broadcast::Receiver<DomainEvent>,
}

impl Subscription {
    /// The entity kind this subscription delivers.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Wait for the next event, FIFO in publish order.
    pub async fn recv(&mut self) -> Result<DomainEvent, SubscriptionError> {
        match self.rx.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                Err(SubscriptionError::Lagged { missed })
            }
            Err(broadcast::error::RecvError::Closed) => Err(SubscriptionError::Closed),
        }
    }

    /// Take an event without waiting. `Ok(None)` means the stream is empty
    /// but still live.
    pub fn try_recv(&mut self) -> Result<Option<DomainEvent>, SubscriptionError> {
        use tokio::sync::broadcast::error::TryRecvError;
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Lagged(missed)) => Err(SubscriptionError::Lagged { missed }),
            Err(TryRecvError::Closed) => Err(SubscriptionError::Closed),
        }
    }

    /// Stop delivery. Equivalent to dropping the handle.
    pub fn cancel(self) {
        drop(self);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
