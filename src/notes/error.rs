//! Note service errors

use crate::protocol::{Status, StatusCode};

/// Error type for note operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotesError {
    #[error("note not found: {0}")]
    NotFound(i64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl NotesError {
    /// Status reported to the remote caller
    pub fn to_status(&self) -> Status {
        let code = match self {
            NotesError::NotFound(_) => StatusCode::NotFound,
            NotesError::InvalidArgument(_) => StatusCode::InvalidArgument,
            NotesError::Unauthenticated(_) => StatusCode::Unauthenticated,
            NotesError::Storage(_) => StatusCode::Internal,
        };
        Status::new(code, self.to_string())
    }
}

impl From<Status> for NotesError {
    fn from(status: Status) -> Self {
        match status.code {
            StatusCode::Unauthenticated => NotesError::Unauthenticated(status.message),
            StatusCode::InvalidArgument => NotesError::InvalidArgument(status.message),
            _ => NotesError::Storage(status.message),
        }
    }
}
