//! Duplex stream primitives
//!
//! The stream handlers in [`crate::session`] never touch sockets directly.
//! They read through a [`FrameSource`] and write through a [`FrameSink`], so
//! the same session logic runs over TCP ([`framed`]) or in-process
//! channels ([`memory`]).
//!
//! A sink is driven through `&mut self`, so a session that owns exactly one
//! writer cannot interleave two frames on the wire.

pub mod error;
pub mod framed;
pub mod memory;

use std::future::Future;

pub use error::TransportError;
pub use framed::{FramedSink, FramedSource};
pub use memory::{MemoryPeer, MemorySink, MemorySource};

/// Read half of a stream
pub trait FrameSource<T>: Send {
    /// Receive the next frame
    ///
    /// Returns `Ok(None)` once the peer has closed its send side.
    fn recv(&mut self) -> impl Future<Output = Result<Option<T>, TransportError>> + Send;
}

/// Write half of a stream
pub trait FrameSink<T>: Send {
    /// Write one frame and flush it
    fn send(&mut self, frame: T) -> impl Future<Output = Result<(), TransportError>> + Send;
}
