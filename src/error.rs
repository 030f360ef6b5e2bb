//! Error types

use crate::notes::NotesError;
use crate::protocol::Status;
use crate::server::config::ConfigError;
use crate::transport::TransportError;

/// Crate-wide error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Notes(#[from] NotesError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error status returned by a remote server
    #[error("rpc failed: {0}")]
    Rpc(#[from] Status),

    /// Peer violated the connection protocol
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Whether this error is an expected end of a stream
    pub fn is_graceful(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_graceful(),
            Error::Rpc(status) => status.code.is_graceful(),
            _ => false,
        }
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
