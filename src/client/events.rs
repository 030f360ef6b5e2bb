//! Event subscriber

use chrono::{DateTime, Utc};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::protocol::{EventFrame, Method, Note, Request};
use crate::transport::{FrameSource, FramedSink, FramedSource};

use super::config::ClientConfig;
use super::connector;

/// Events from a note subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberEvent {
    /// Server heartbeat
    HealthCheck(DateTime<Utc>),

    /// A note was created
    NoteCreated(Note),

    /// Server closed the stream
    Closed,

    /// Stream failed
    Error(String),
}

/// Subscription to created-note events
pub struct EventSubscriber {
    sink: Option<FramedSink<OwnedWriteHalf, Request>>,
}

impl EventSubscriber {
    /// Subscribe to note events for `user_id`.
    ///
    /// Returns the subscriber and a receiver for events.
    pub async fn connect(
        config: ClientConfig,
        user_id: i64,
    ) -> Result<(Self, mpsc::Receiver<SubscriberEvent>)> {
        let request = Request::new(Method::SubscribeToEvents { user_id });
        let opened = connector::open_stream(&config, request).await?;
        let (tx, rx) = mpsc::channel(config.event_buffer);

        tokio::spawn(read_loop(opened.source.retype::<EventFrame>(), tx));

        Ok((
            Self {
                sink: Some(opened.sink),
            },
            rx,
        ))
    }

    /// End the subscription
    pub async fn unsubscribe(&mut self) -> Result<()> {
        if let Some(mut sink) = self.sink.take() {
            sink.close().await?;
        }
        Ok(())
    }
}

async fn read_loop(
    mut source: FramedSource<OwnedReadHalf, EventFrame>,
    tx: mpsc::Sender<SubscriberEvent>,
) {
    loop {
        let event = match source.recv().await {
            Ok(Some(EventFrame::HealthCheck(check))) => {
                SubscriberEvent::HealthCheck(check.timestamp)
            }
            Ok(Some(EventFrame::CreatedNote(note))) => SubscriberEvent::NoteCreated(note),
            Ok(None) => {
                let _ = tx.send(SubscriberEvent::Closed).await;
                return;
            }
            Err(e) => {
                let _ = tx.send(SubscriberEvent::Error(e.to_string())).await;
                return;
            }
        };

        if tx.send(event).await.is_err() {
            return;
        }
    }
}
