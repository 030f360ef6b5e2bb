//! Per-subscriber view of the event hub

use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;

use crate::protocol::NoteEvent;

use super::cell::CellCursor;

/// A subscriber's registration with the [`EventHub`](super::EventHub)
///
/// Each subscription has its own cursor into the shared cell. Two
/// subscriptions created at different times both observe only the latest
/// value at the moment each of them waits; neither sees a backlog.
///
/// The registration is released when the subscription is dropped or as soon
/// as [`next`](Self::next) observes cancellation.
pub struct HubSubscription {
    cursor: Option<CellCursor<NoteEvent>>,
    cancel: CancellationToken,
}

impl HubSubscription {
    pub(super) fn new(cursor: CellCursor<NoteEvent>, cancel: CancellationToken) -> Self {
        Self {
            cursor: Some(cursor),
            cancel,
        }
    }

    /// Wait for the next published event
    ///
    /// Returns the latest event published since the previous call, or `None`
    /// once the subscription is cancelled or the hub is gone. Cancel-safe.
    pub async fn next(&mut self) -> Option<NoteEvent> {
        if self.cancel.is_cancelled() {
            self.cursor = None;
            return None;
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return None;
        };

        let changed = tokio::select! {
            _ = self.cancel.cancelled() => None,
            changed = cursor.changed() => changed,
        };

        match changed {
            Some(versioned) => Some(versioned.value),
            None => {
                self.cursor = None;
                None
            }
        }
    }

    /// Whether the subscription still holds its registration
    pub fn is_active(&self) -> bool {
        self.cursor.is_some() && !self.cancel.is_cancelled()
    }

    /// Token governing this subscription
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Consume the subscription as a lazy stream of events
    ///
    /// The stream is infinite until cancellation. To start over, subscribe
    /// again; a fresh subscription does not replay.
    pub fn into_stream(self) -> impl Stream<Item = NoteEvent> + Send {
        stream::unfold(self, |mut sub| async move {
            let event = sub.next().await?;
            Some((event, sub))
        })
    }
}
