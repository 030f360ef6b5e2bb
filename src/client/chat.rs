//! Chat client
//!
//! Sends messages with fresh correlation ids and reports pushed content and
//! acknowledgements as [`ChatEvent`]s.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::{ClientFrame, Method, Request, ServerFrame};
use crate::transport::{FrameSink, FrameSource, FramedSink, FramedSource};

use super::config::ClientConfig;
use super::connector;

/// Events from a chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Content pushed by the server
    Message(String),

    /// A sent message was acknowledged
    Ack(String),

    /// Server closed the stream
    Closed,

    /// Stream failed
    Error(String),
}

/// Chat client
///
/// # Example
/// ```no_run
/// use notes_rt::client::{ChatClient, ClientConfig};
///
/// # async fn example() -> notes_rt::error::Result<()> {
/// let (mut chat, mut events) = ChatClient::connect(ClientConfig::new("127.0.0.1:50051")).await?;
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// let id = chat.send("hello").await?;
/// println!("sent {}", id);
/// chat.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct ChatClient {
    sink: Option<FramedSink<OwnedWriteHalf, ClientFrame>>,
}

impl ChatClient {
    /// Open a chat session.
    ///
    /// Returns the client and a receiver for events.
    pub async fn connect(config: ClientConfig) -> Result<(Self, mpsc::Receiver<ChatEvent>)> {
        let opened = connector::open_stream(&config, Request::new(Method::Chat)).await?;
        let (tx, rx) = mpsc::channel(config.event_buffer);

        tokio::spawn(read_loop(opened.source.retype::<ServerFrame>(), tx));

        let client = Self {
            sink: Some(opened.sink.retype::<ClientFrame>()),
        };
        Ok((client, rx))
    }

    /// Send a message and return its correlation id
    pub async fn send(&mut self, content: impl Into<String>) -> Result<String> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| Error::Protocol("chat stream already closed".into()))?;

        let correlation_id = uuid::Uuid::new_v4().to_string();
        sink.send(ClientFrame::new(correlation_id.clone(), content)).await?;

        Ok(correlation_id)
    }

    /// Close the send side; acks for sent messages still arrive
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut sink) = self.sink.take() {
            sink.close().await?;
        }
        Ok(())
    }

    /// Check if the send side is still open
    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }
}

async fn read_loop(
    mut source: FramedSource<OwnedReadHalf, ServerFrame>,
    tx: mpsc::Sender<ChatEvent>,
) {
    loop {
        let event = match source.recv().await {
            Ok(Some(frame)) => match frame.acked_id() {
                Some(id) => ChatEvent::Ack(id.to_string()),
                None => ChatEvent::Message(frame.content.unwrap_or_default()),
            },
            Ok(None) => {
                let _ = tx.send(ChatEvent::Closed).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(ChatEvent::Error(e.to_string())).await;
                return;
            }
        };

        if tx.send(event).await.is_err() {
            return;
        }
    }
}
