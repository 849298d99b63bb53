//! In-process event bus.
//!
//! The watch engine and the connection handlers publish here. Client
//! connections subscribe to a `tokio::sync::broadcast` channel, so
//! publishing never waits on a subscriber. A subscriber that falls behind
//! loses the oldest events and carries on. Nothing is replayed to late
//! subscribers.
//!
//! The session registry keeps exact counts, so it reads a separate unbounded
//! `mpsc` feed that receives every event in publish order.

use tokio::sync::{broadcast, mpsc};

use crate::watcher::ChangeRecord;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Everything that flows over the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// A watched file appeared (or was found during the initial scan).
    FileAdded(ChangeRecord),
    /// A watched file finished being written.
    FileModified(ChangeRecord),
    /// A watched file went away.
    FileDeleted(ChangeRecord),
    /// A client connected.
    Connected,
    /// A client disconnected.
    Disconnected,
    /// The initial scan finished. Published once.
    WatchReady,
}

impl BusEvent {
    /// Event name used on the wire and in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FileAdded(_) => "file-added",
            Self::FileModified(_) => "file-modified",
            Self::FileDeleted(_) => "file-deleted",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::WatchReady => "watch-ready",
        }
    }

    /// The change record for file events.
    #[must_use]
    pub const fn record(&self) -> Option<&ChangeRecord> {
        match self {
            Self::FileAdded(r) | Self::FileModified(r) | Self::FileDeleted(r) => Some(r),
            _ => None,
        }
    }
}

/// Cloneable handle to the bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
    registry_feed: Option<mpsc::UnboundedSender<BusEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus buffering `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry_feed: None,
        }
    }

    /// Create a bus that also copies every event into a lossless queue.
    ///
    /// The receiver closes once every clone of the bus is dropped.
    #[must_use]
    pub fn with_registry_feed(capacity: usize) -> (Self, mpsc::UnboundedReceiver<BusEvent>) {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let mut bus = Self::new(capacity);
        bus.registry_feed = Some(feed_tx);
        (bus, feed_rx)
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of broadcast subscribers that will see it.
    pub fn publish(&self, event: BusEvent) -> usize {
        let name = event.name();
        if let Some(feed) = &self.registry_feed {
            if feed.send(event.clone()).is_err() {
                tracing::trace!(event = name, "Registry feed closed");
            }
        }
        match self.sender.send(event) {
            Ok(count) => {
                tracing::trace!(event = name, subscribers = count, "Published");
                count
            }
            Err(_) => {
                tracing::trace!(event = name, "No subscribers");
                0
            }
        }
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }
}
