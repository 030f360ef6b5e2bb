//! Last-value broadcast hub for note events
//!
//! The note service publishes one [`NoteEvent`](crate::protocol::NoteEvent)
//! per created note. Every open event subscription holds a
//! [`HubSubscription`] with its own cursor into a single shared slot.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<EventHub>
//!               ┌─────────────────────────┐
//!               │ LatestValueCell {       │
//!               │   slot: (version, ev),  │
//!               │   watch::Sender         │
//!               │ }                       │
//!               └───────────┬─────────────┘
//!                           │
//!        ┌──────────────────┼──────────────────┐
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//!  [NoteService]     [Subscription]     [Subscription]
//!  publish(ev)       sub.next()         sub.next()
//!                        │                  │
//!                        └──► EventFrame ──► stream
//! ```
//!
//! # Last value wins
//!
//! The hub keeps no history. A subscriber that is busy while two events are
//! published wakes up to the second one only. Clients that need every note
//! must list them through the unary API; the hub only says "something new
//! arrived".

pub mod cell;
pub mod store;
pub mod subscription;

pub use cell::{CellCursor, LatestValueCell, Versioned};
pub use store::{EventHub, HubStats};
pub use subscription::HubSubscription;
