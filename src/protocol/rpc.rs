//! RPC envelopes
//!
//! Each connection opens with exactly one [`Request`]. Unary methods answer
//! with one [`Response`] and the connection closes. Streaming methods answer
//! with [`Response::Accepted`] and then switch to their frame types.

use serde::{Deserialize, Serialize};

use super::frame::Note;

/// Status codes understood by the streaming core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Cancelled,
    DeadlineExceeded,
    Unavailable,
    NotFound,
    Unauthenticated,
    FailedPrecondition,
    InvalidArgument,
    Internal,
}

impl StatusCode {
    /// Codes that describe an expected end of a stream rather than a fault
    pub fn is_graceful(self) -> bool {
        matches!(
            self,
            StatusCode::Cancelled | StatusCode::DeadlineExceeded | StatusCode::Unavailable
        )
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusCode::Cancelled => "cancelled",
            StatusCode::DeadlineExceeded => "deadline exceeded",
            StatusCode::Unavailable => "unavailable",
            StatusCode::NotFound => "not found",
            StatusCode::Unauthenticated => "unauthenticated",
            StatusCode::FailedPrecondition => "failed precondition",
            StatusCode::InvalidArgument => "invalid argument",
            StatusCode::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Error status returned to a remote caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Unauthenticated, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, message)
    }
}

/// Method invoked by the opening frame of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Method {
    /// Duplex chat session
    Chat,
    /// Server-push note events
    SubscribeToEvents { user_id: i64 },
    /// Client-push metrics answered with one summary
    UploadMetrics,
    CreateNote { title: String, content: String },
    GetNote { note_id: i64 },
    GetNotes { user_id: i64 },
    DeleteNote { note_id: i64 },
}

impl Method {
    /// Whether the method keeps the connection open as a stream
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            Method::Chat | Method::SubscribeToEvents { .. } | Method::UploadMetrics
        )
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Method::Chat => "chat",
            Method::SubscribeToEvents { .. } => "subscribe_to_events",
            Method::UploadMetrics => "upload_metrics",
            Method::CreateNote { .. } => "create_note",
            Method::GetNote { .. } => "get_note",
            Method::GetNotes { .. } => "get_notes",
            Method::DeleteNote { .. } => "delete_note",
        }
    }
}

/// Opening frame of every connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Bearer token, checked for unary methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(flatten)]
    pub method: Method,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            authorization: None,
            method,
        }
    }

    /// Attach a bearer token
    pub fn with_authorization(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(token.into());
        self
    }
}

/// Answer to a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "data", rename_all = "snake_case")]
pub enum Response {
    /// Streaming method accepted; frames follow
    Accepted,
    Note(Note),
    Notes(Vec<Note>),
    Deleted,
    Error(Status),
}
