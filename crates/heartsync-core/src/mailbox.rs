//! Single-slot snapshot handoff between the network side and the tick loop
//!
//! The network task publishes, the consumer tick drains. Both sides are
//! a single atomic pointer exchange: publishing never blocks, draining an
//! empty slot returns `None` immediately. An unread snapshot is replaced
//! by the next one, so the consumer always sees the freshest reading.

use crate::snapshot::TelemetrySnapshot;
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Mailbox counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    /// Snapshots published since creation
    pub published: u64,
    /// Snapshots replaced before the consumer read them
    pub overwritten: u64,
    /// Snapshots handed to the consumer
    pub taken: u64,
}

/// Last-write-wins holding cell for the most recent snapshot.
#[derive(Debug, Default)]
pub struct SnapshotMailbox {
    slot: ArcSwapOption<TelemetrySnapshot>,
    published: AtomicU64,
    overwritten: AtomicU64,
    taken: AtomicU64,
}

impl SnapshotMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot`, discarding any unread predecessor.
    ///
    /// Returns `true` if an unread snapshot was overwritten.
    pub fn publish(&self, snapshot: TelemetrySnapshot) -> bool {
        let previous = self.slot.swap(Some(Arc::new(snapshot)));
        self.published.fetch_add(1, Ordering::Relaxed);
        if previous.is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Take the pending snapshot, leaving the slot empty.
    pub fn take(&self) -> Option<Arc<TelemetrySnapshot>> {
        let snapshot = self.slot.swap(None);
        if snapshot.is_some() {
            self.taken.fetch_add(1, Ordering::Relaxed);
        }
        snapshot
    }

    /// Whether an unread snapshot is waiting.
    pub fn has_pending(&self) -> bool {
        self.slot.load().is_some()
    }

    pub fn stats(&self) -> MailboxStats {
        MailboxStats {
            published: self.published.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            taken: self.taken.load(Ordering::Relaxed),
        }
    }
}
