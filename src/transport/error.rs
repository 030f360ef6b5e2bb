//! Transport error type
//!
//! Read and write failures carry a [`StatusCode`] so the stream handlers can
//! tell an expected disconnect from a fault.

use crate::protocol::StatusCode;

/// Error raised by a [`FrameSource`](super::FrameSource) or [`FrameSink`](super::FrameSink)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport {code}: {message}")]
pub struct TransportError {
    pub code: StatusCode,
    pub message: String,
}

impl TransportError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(StatusCode::Cancelled, "stream cancelled")
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Internal, message)
    }

    /// Whether this error ends a stream without being a server fault
    pub fn is_graceful(&self) -> bool {
        self.code.is_graceful()
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match err.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof => StatusCode::Unavailable,
            ErrorKind::TimedOut => StatusCode::DeadlineExceeded,
            ErrorKind::InvalidData => StatusCode::InvalidArgument,
            _ => StatusCode::Internal,
        };

        Self::new(code, err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(StatusCode::InvalidArgument, format!("malformed frame: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_mapping() {
        let reset: TransportError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        assert_eq!(reset.code, StatusCode::Unavailable);
        assert!(reset.is_graceful());

        let pipe: TransportError = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert_eq!(pipe.code, StatusCode::Unavailable);

        let timed_out: TransportError = io::Error::from(io::ErrorKind::TimedOut).into();
        assert_eq!(timed_out.code, StatusCode::DeadlineExceeded);

        let other: TransportError = io::Error::other("disk on fire").into();
        assert_eq!(other.code, StatusCode::Internal);
        assert!(!other.is_graceful());
    }
}
