//! Event hub implementation
//!
//! The process-wide hub that carries the "note created" signal from the
//! note service to every open event subscription.

use tokio_util::sync::CancellationToken;

use crate::protocol::NoteEvent;

use super::cell::LatestValueCell;
use super::subscription::HubSubscription;

/// Last-value broadcast hub for note events
///
/// Holds exactly one [`LatestValueCell`]. Publishing overwrites it and wakes
/// all waiting subscribers. A subscriber that is not waiting while two
/// publishes happen observes only the second one. This is liveness
/// signalling, not an event log.
pub struct EventHub {
    cell: LatestValueCell<NoteEvent>,
}

impl EventHub {
    /// Create a hub with an empty cell
    pub fn new() -> Self {
        Self {
            cell: LatestValueCell::new(),
        }
    }

    /// Publish a note event
    ///
    /// Fire-and-forget: never waits on subscribers, succeeds with none.
    pub fn publish(&self, event: NoteEvent) {
        let note_id = event.created_note.id;
        let version = self.cell.publish(event);

        tracing::debug!(
            note_id = note_id,
            version = version,
            subscribers = self.cell.cursor_count(),
            "Note event published"
        );
    }

    /// Register a subscriber
    ///
    /// The subscription ends when `cancel` fires. Events published before
    /// this call are not delivered.
    pub fn subscribe(&self, cancel: CancellationToken) -> HubSubscription {
        let subscription = HubSubscription::new(self.cell.cursor(), cancel);

        tracing::debug!(
            subscribers = self.cell.cursor_count(),
            "Hub subscriber added"
        );

        subscription
    }

    /// Most recently published event
    pub fn latest(&self) -> Option<NoteEvent> {
        self.cell.latest().map(|versioned| versioned.value)
    }

    /// Number of live subscriber registrations
    pub fn subscriber_count(&self) -> usize {
        self.cell.cursor_count()
    }

    /// Snapshot of hub statistics
    pub fn stats(&self) -> HubStats {
        HubStats {
            subscriber_count: self.cell.cursor_count(),
            published: self.cell.version(),
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for the event hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    /// Live subscriber registrations
    pub subscriber_count: usize,
    /// Events published since the hub was created
    pub published: u64,
}
