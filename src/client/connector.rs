//! Connection setup shared by all clients

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::protocol::{Request, Response};
use crate::transport::framed::split_tcp;
use crate::transport::{FrameSink, FrameSource, FramedSink, FramedSource};

use super::config::ClientConfig;

/// Connection that has sent its opening request
pub(crate) struct Opened {
    pub source: FramedSource<OwnedReadHalf, Response>,
    pub sink: FramedSink<OwnedWriteHalf, Request>,
}

/// Connect and send the opening request
pub(crate) async fn open(config: &ClientConfig, mut request: Request) -> Result<Opened> {
    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&config.addr))
        .await
        .map_err(|_| Error::Protocol(format!("connect to {} timed out", config.addr)))??;
    stream.set_nodelay(true)?;

    if request.authorization.is_none() {
        request.authorization = config.authorization.clone();
    }

    let (source, mut sink) = split_tcp::<Response, Request>(stream, config.max_frame_length);
    sink.send(request).await?;

    Ok(Opened { source, sink })
}

/// Read the single response to the opening request
pub(crate) async fn read_response(opened: &mut Opened) -> Result<Response> {
    match opened.source.recv().await? {
        Some(Response::Error(status)) => Err(Error::Rpc(status)),
        Some(response) => Ok(response),
        None => Err(Error::Protocol("connection closed before response".into())),
    }
}

/// Open a streaming method and wait for it to be accepted
pub(crate) async fn open_stream(config: &ClientConfig, request: Request) -> Result<Opened> {
    let mut opened = open(config, request).await?;
    match read_response(&mut opened).await? {
        Response::Accepted => Ok(opened),
        other => Err(Error::Protocol(format!("unexpected response: {:?}", other))),
    }
}
