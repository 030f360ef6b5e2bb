//! Length-delimited JSON framing over byte streams
//!
//! Each frame is a 4-byte big-endian length followed by a JSON document.
//! Framing comes from `tokio_util::codec::LengthDelimitedCodec`; payloads are
//! encoded with `serde_json`.

use std::marker::PhantomData;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use super::{FrameSink, FrameSource, TransportError};

fn codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec()
}

/// Frame reader decoding `T` from a byte stream
pub struct FramedSource<R, T> {
    inner: FramedRead<R, LengthDelimitedCodec>,
    _frame: PhantomData<fn() -> T>,
}

impl<R: AsyncRead, T> FramedSource<R, T> {
    /// Wrap a reader
    pub fn new(reader: R, max_frame_length: usize) -> Self {
        Self {
            inner: FramedRead::new(reader, codec(max_frame_length)),
            _frame: PhantomData,
        }
    }

    /// Reinterpret the following frames as `U`
    ///
    /// Bytes already buffered are kept, so nothing read ahead is lost when a
    /// connection switches from its opening request to stream frames.
    pub fn retype<U>(self) -> FramedSource<R, U> {
        FramedSource {
            inner: self.inner,
            _frame: PhantomData,
        }
    }
}

impl<R, T> FrameSource<T> for FramedSource<R, T>
where
    R: AsyncRead + Unpin + Send,
    T: DeserializeOwned + Send,
{
    async fn recv(&mut self) -> Result<Option<T>, TransportError> {
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

/// Frame writer encoding `T` onto a byte stream
pub struct FramedSink<W, T> {
    inner: FramedWrite<W, LengthDelimitedCodec>,
    _frame: PhantomData<fn(T)>,
}

impl<W: AsyncWrite, T> FramedSink<W, T> {
    /// Wrap a writer
    pub fn new(writer: W, max_frame_length: usize) -> Self {
        Self {
            inner: FramedWrite::new(writer, codec(max_frame_length)),
            _frame: PhantomData,
        }
    }

    /// Reinterpret the following frames as `U`
    pub fn retype<U>(self) -> FramedSink<W, U> {
        FramedSink {
            inner: self.inner,
            _frame: PhantomData,
        }
    }
}

impl<W: AsyncWrite + Unpin, T> FramedSink<W, T> {
    /// Flush and shut down the write side
    pub async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::<Bytes>::close(&mut self.inner).await?;
        Ok(())
    }
}

impl<W, T> FrameSink<T> for FramedSink<W, T>
where
    W: AsyncWrite + Unpin + Send,
    T: Serialize + Send,
{
    async fn send(&mut self, frame: T) -> Result<(), TransportError> {
        let payload = Bytes::from(serde_json::to_vec(&frame)?);
        self.inner.send(payload).await?;
        Ok(())
    }
}

/// Split a TCP connection into a typed reader and writer
pub fn split_tcp<In, Out>(
    stream: TcpStream,
    max_frame_length: usize,
) -> (
    FramedSource<OwnedReadHalf, In>,
    FramedSink<OwnedWriteHalf, Out>,
) {
    let (read, write) = stream.into_split();
    (
        FramedSource::new(read, max_frame_length),
        FramedSink::new(write, max_frame_length),
    )
}
