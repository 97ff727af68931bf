//! Concurrent in-memory inventories with event fan-out.
//!
//! Each store is a reader/writer-locked map plus an independently locked
//! watcher registry. Every successful mutation commits the map change and
//! fans an event out to all watchers before the write lock is released, so
//! each watcher observes events in mutation-commit order. Fan-out is
//! non-blocking: a watcher whose buffer is full loses the event (logged).

pub mod cells;
pub mod event;
pub mod nodes;
pub mod subscriptions;
pub mod ues;
pub mod watchers;

pub use cells::CellStore;
pub use event::{Event, EventKind};
pub use nodes::NodeStore;
pub use subscriptions::{Subscription, SubscriptionId, SubscriptionStore};
pub use ues::UeStore;
pub use watchers::{WatchHandle, WatchOptions, WatcherId, Watchers};
