//! Watcher registry shared by the entity stores.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::warn;

use super::event::Event;

/// Default watcher channel capacity.
pub const DEFAULT_WATCH_CAPACITY: usize = 256;

/// Identifier of a registered watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher-{}", self.0)
    }
}

/// Options for attaching a watcher.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Stream a replay event for every currently-present entity before any
    /// live event.
    pub replay: bool,
    /// Buffer capacity of the watcher channel.
    pub capacity: usize,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            replay: false,
            capacity: DEFAULT_WATCH_CAPACITY,
        }
    }
}

impl WatchOptions {
    /// Options with replay enabled.
    pub fn replay() -> Self {
        Self {
            replay: true,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct WatcherEntry<K, V> {
    id: WatcherId,
    tx: mpsc::Sender<Event<K, V>>,
}

/// Registry of watcher channels for one store.
///
/// Independently synchronized from the entity map so that registration and
/// fan-out serialize against each other: replay events enqueued during
/// registration are totally ordered against subsequent live events.
#[derive(Debug)]
pub struct Watchers<K, V> {
    entries: Mutex<Vec<WatcherEntry<K, V>>>,
    next_id: AtomicU64,
}

impl<K, V> Default for Watchers<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Watchers<K, V> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a watcher, enqueueing the given replay events before the
    /// watcher can observe any live event.
    pub fn add(&self, tx: mpsc::Sender<Event<K, V>>, replay: Vec<Event<K, V>>) -> WatcherId {
        let id = WatcherId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for event in replay {
            if tx.try_send(event).is_err() {
                warn!(%id, "watcher buffer full during replay, dropping event");
            }
        }
        entries.push(WatcherEntry { id, tx });
        id
    }

    /// Deregisters a watcher. Returns false if it was not registered.
    pub fn remove(&self, id: WatcherId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    /// Number of registered watchers.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns true if no watchers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Watchers<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Fans an event out to every watcher. Watchers with full buffers lose
    /// the event; watchers whose receiver is gone are pruned.
    pub fn send(&self, event: Event<K, V>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|entry| match entry.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(id = %entry.id, "watcher buffer full, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

/// Handle of an attached watcher. Dropping it deregisters the watcher.
pub struct WatchHandle<K, V> {
    id: WatcherId,
    watchers: Arc<Watchers<K, V>>,
    rx: mpsc::Receiver<Event<K, V>>,
}

impl<K, V> WatchHandle<K, V> {
    pub(crate) fn new(
        id: WatcherId,
        watchers: Arc<Watchers<K, V>>,
        rx: mpsc::Receiver<Event<K, V>>,
    ) -> Self {
        Self { id, watchers, rx }
    }

    /// The watcher identifier.
    pub fn id(&self) -> WatcherId {
        self.id
    }

    /// Receives the next event.
    pub async fn recv(&mut self) -> Option<Event<K, V>> {
        self.rx.recv().await
    }

    /// Receives without waiting.
    pub fn try_recv(&mut self) -> Option<Event<K, V>> {
        self.rx.try_recv().ok()
    }
}

impl<K, V> Drop for WatchHandle<K, V> {
    fn drop(&mut self) {
        self.watchers.remove(self.id);
    }
}
