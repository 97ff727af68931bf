//! Store events delivered to watchers.

/// Kind of change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Replay of an entity that already existed when the watcher attached.
    None,
    /// The entity was created.
    Created,
    /// The entity was updated.
    Updated,
    /// The entity was deleted.
    Deleted,
}

/// A store event: the affected key, a snapshot of the value, and the kind
/// of change.
#[derive(Debug, Clone)]
pub struct Event<K, V> {
    /// Identifier of the affected entity.
    pub key: K,
    /// Snapshot of the entity at commit time.
    pub value: V,
    /// Kind of change.
    pub kind: EventKind,
}

impl<K, V> Event<K, V> {
    /// Creates a new event.
    pub fn new(key: K, value: V, kind: EventKind) -> Self {
        Self { key, value, kind }
    }
}
