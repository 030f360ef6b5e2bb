//! In-process duplex transport
//!
//! [`duplex`] returns the server-side halves plus a [`MemoryPeer`] that plays
//! the remote client: it can push frames, close its send side, read what the
//! server wrote, and inject read or write failures.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::{FrameSink, FrameSource, TransportError};

/// Server-side read half of an in-process stream
pub struct MemorySource<T> {
    rx: mpsc::Receiver<Result<T, TransportError>>,
}

/// Server-side write half of an in-process stream
pub struct MemorySink<T> {
    tx: mpsc::Sender<T>,
    write_error: Arc<Mutex<Option<TransportError>>>,
}

/// Remote end of an in-process stream
pub struct MemoryPeer<In, Out> {
    tx: Option<mpsc::Sender<Result<In, TransportError>>>,
    rx: mpsc::Receiver<Out>,
    write_error: Arc<Mutex<Option<TransportError>>>,
}

/// Create an in-process duplex stream
///
/// `In` flows from the peer to the server, `Out` from the server to the peer.
/// Each direction buffers up to `capacity` frames.
pub fn duplex<In, Out>(capacity: usize) -> (MemorySource<In>, MemorySink<Out>, MemoryPeer<In, Out>) {
    let (in_tx, in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let write_error = Arc::new(Mutex::new(None));

    let source = MemorySource { rx: in_rx };
    let sink = MemorySink {
        tx: out_tx,
        write_error: Arc::clone(&write_error),
    };
    let peer = MemoryPeer {
        tx: Some(in_tx),
        rx: out_rx,
        write_error,
    };

    (source, sink, peer)
}

impl<T: Send> FrameSource<T> for MemorySource<T> {
    async fn recv(&mut self) -> Result<Option<T>, TransportError> {
        match self.rx.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

impl<T: Send> FrameSink<T> for MemorySink<T> {
    async fn send(&mut self, frame: T) -> Result<(), TransportError> {
        let injected = self
            .write_error
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or(None);
        if let Some(err) = injected {
            return Err(err);
        }

        self.tx
            .send(frame)
            .await
            .map_err(|_| TransportError::unavailable("peer went away"))
    }
}

impl<In: Send, Out: Send> MemoryPeer<In, Out> {
    /// Send a frame to the server
    ///
    /// Returns false if the send side is closed or the server dropped its
    /// read half.
    pub async fn send(&self, frame: In) -> bool {
        match self.tx {
            Some(ref tx) => tx.send(Ok(frame)).await.is_ok(),
            None => false,
        }
    }

    /// Make the server's next read fail with `err`
    pub async fn fail_reads(&self, err: TransportError) -> bool {
        match self.tx {
            Some(ref tx) => tx.send(Err(err)).await.is_ok(),
            None => false,
        }
    }

    /// Make every subsequent server write fail with `err`
    pub fn fail_writes(&self, err: TransportError) {
        if let Ok(mut slot) = self.write_error.lock() {
            *slot = Some(err);
        }
    }

    /// Close the peer's send side; the server reads end-of-stream
    pub fn close(&mut self) {
        self.tx.take();
    }

    /// Receive the next frame written by the server
    ///
    /// Returns `None` once the server has dropped its write half.
    pub async fn recv(&mut self) -> Option<Out> {
        self.rx.recv().await
    }

    /// Receive a frame if one is already buffered
    pub fn try_recv(&mut self) -> Option<Out> {
        self.rx.try_recv().ok()
    }

    /// Drain everything until the server drops its write half
    pub async fn collect(mut self) -> Vec<Out> {
        self.close();
        let mut frames = Vec::new();
        while let Some(frame) = self.rx.recv().await {
            frames.push(frame);
        }
        frames
    }
}
