//! Frame types exchanged on the realtime streams
//!
//! Chat sessions exchange [`ClientFrame`]s and [`ServerFrame`]s. Event
//! subscriptions push [`EventFrame`]s, which are either a created note or a
//! [`HealthCheck`] heartbeat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat frame sent by the client
///
/// The correlation id is chosen by the sender. Uniqueness is the caller's
/// responsibility; the server acknowledges whatever id it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame {
    /// Sender-chosen token echoed back in the acknowledgement
    pub correlation_id: String,
    /// Message text
    pub content: String,
}

impl ClientFrame {
    /// Create a new client frame
    pub fn new(correlation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            content: content.into(),
        }
    }
}

/// A chat frame sent by the server
///
/// A frame either pushes content or acknowledges a client frame, never both.
/// Build them with [`ServerFrame::content`] and [`ServerFrame::ack`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame {
    /// Pushed text (content frames only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether this frame acknowledges a client frame
    #[serde(default)]
    pub is_ack: bool,
    /// Acknowledged correlation id (ack frames only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ServerFrame {
    /// Create a content push frame
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            is_ack: false,
            correlation_id: None,
        }
    }

    /// Create an acknowledgement for the given correlation id
    pub fn ack(correlation_id: impl Into<String>) -> Self {
        Self {
            content: None,
            is_ack: true,
            correlation_id: Some(correlation_id.into()),
        }
    }

    /// Correlation id if this is an ack frame
    pub fn acked_id(&self) -> Option<&str> {
        if self.is_ack {
            self.correlation_id.as_deref()
        } else {
            None
        }
    }
}

/// A stored note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signal produced once per successfully created note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Snapshot of the note at creation time
    pub created_note: Note,
}

impl NoteEvent {
    pub fn new(created_note: Note) -> Self {
        Self { created_note }
    }
}

/// One metrics sample uploaded by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsFrame {
    pub note_view_counter: i64,
}

impl MetricsFrame {
    pub fn new(note_view_counter: i64) -> Self {
        Self { note_view_counter }
    }
}

/// Answer to a metrics upload: the sum of every sample received
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_view: i64,
}

/// Liveness frame for event subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub timestamp: DateTime<Utc>,
}

impl HealthCheck {
    /// Synthesize a heartbeat stamped with the current time
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

/// Frame pushed on an event subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventFrame {
    /// Heartbeat
    HealthCheck(HealthCheck),
    /// A note was created
    CreatedNote(Note),
}

impl EventFrame {
    /// Check if this is a heartbeat
    pub fn is_health_check(&self) -> bool {
        matches!(self, EventFrame::HealthCheck(_))
    }

    /// The created note carried by this frame, if any
    pub fn created_note(&self) -> Option<&Note> {
        match self {
            EventFrame::CreatedNote(note) => Some(note),
            EventFrame::HealthCheck(_) => None,
        }
    }
}

impl From<NoteEvent> for EventFrame {
    fn from(event: NoteEvent) -> Self {
        EventFrame::CreatedNote(event.created_note)
    }
}

impl From<HealthCheck> for EventFrame {
    fn from(hc: HealthCheck) -> Self {
        EventFrame::HealthCheck(hc)
    }
}
