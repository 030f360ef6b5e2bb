//! Per-connection handling
//!
//! Every connection opens with one [`Request`]. Streaming methods answer
//! [`Response::Accepted`] and hand the connection to a session; unary
//! methods answer a single response and close.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::auth::{Authenticator, RequestContext};
use crate::error::{Error, Result};
use crate::hub::EventHub;
use crate::notes::{NoteRepository, NoteService, NotesError};
use crate::protocol::{
    ClientFrame, EventFrame, MetricsFrame, MetricsSummary, Method, Request, Response, ServerFrame,
};
use crate::server::config::ServerConfig;
use crate::session::{ChatSession, MetricsSession, SessionContext, SubscriptionSession};
use crate::transport::framed::split_tcp;
use crate::transport::{FrameSink, FrameSource, FramedSink, FramedSource};

type Source<T> = FramedSource<OwnedReadHalf, T>;
type Sink<T> = FramedSink<OwnedWriteHalf, T>;

/// State shared by all connections of a server
pub(crate) struct ServerState<R: NoteRepository> {
    pub config: ServerConfig,
    pub hub: Arc<EventHub>,
    pub service: NoteService<R>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// One accepted client connection
pub(crate) struct Connection<R: NoteRepository> {
    session_id: u64,
    peer_addr: SocketAddr,
    state: Arc<ServerState<R>>,
    cancel: CancellationToken,
}

impl<R: NoteRepository> Connection<R> {
    pub fn new(
        session_id: u64,
        peer_addr: SocketAddr,
        state: Arc<ServerState<R>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            peer_addr,
            state,
            cancel,
        }
    }

    /// Serve the connection to completion
    pub async fn run(self, socket: TcpStream) -> Result<()> {
        let (mut source, sink) =
            split_tcp::<Request, Response>(socket, self.state.config.max_frame_length);

        let request = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            request = tokio::time::timeout(self.state.config.handshake_timeout, source.recv()) => {
                match request {
                    Ok(Ok(Some(request))) => request,
                    Ok(Ok(None)) => {
                        tracing::debug!(session_id = self.session_id, "Closed before request");
                        return Ok(());
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => {
                        return Err(Error::Protocol("no request within handshake timeout".into()))
                    }
                }
            }
        };

        tracing::debug!(
            session_id = self.session_id,
            method = request.method.name(),
            "Request received"
        );

        match request.method {
            Method::Chat => {
                let ctx = self.context(request.authorization.as_deref());
                self.serve_chat(ctx, source, sink).await
            }
            Method::SubscribeToEvents { user_id } => {
                let ctx = self.context(request.authorization.as_deref());
                self.serve_subscription(ctx, source, sink, user_id).await
            }
            Method::UploadMetrics => {
                let ctx = self.context(request.authorization.as_deref());
                self.serve_metrics(ctx, source, sink).await
            }
            method => self.serve_unary(sink, request.authorization.as_deref(), method).await,
        }
    }

    /// Streams do not require a token, but a valid one identifies the caller
    fn context(&self, authorization: Option<&str>) -> SessionContext {
        let request = authorization
            .and_then(|token| self.state.authenticator.authenticate(Some(token)).ok())
            .unwrap_or_default();

        SessionContext::with_peer(self.session_id, self.peer_addr).request(request)
    }

    async fn serve_chat(
        &self,
        ctx: SessionContext,
        source: Source<Request>,
        mut sink: Sink<Response>,
    ) -> Result<()> {
        sink.send(Response::Accepted).await?;

        let session = ChatSession::new(self.state.config.chat.clone(), ctx);
        let stats = session
            .run(
                source.retype::<ClientFrame>(),
                sink.retype::<ServerFrame>(),
                &self.cancel,
            )
            .await?;

        tracing::info!(
            session_id = self.session_id,
            frames_received = stats.frames_received,
            acks_sent = stats.acks_sent,
            content_sent = stats.content_sent,
            "Chat session ended"
        );
        Ok(())
    }

    async fn serve_subscription(
        &self,
        ctx: SessionContext,
        source: Source<Request>,
        mut sink: Sink<Response>,
        user_id: i64,
    ) -> Result<()> {
        sink.send(Response::Accepted).await?;

        // Subscribers never send; the read half only reports the peer leaving.
        let scope = self.cancel.child_token();
        let mut source: Source<serde_json::Value> = source.retype();
        let closed = async {
            while let Ok(Some(_)) = source.recv().await {}
            tracing::debug!(session_id = self.session_id, "Subscriber closed its stream");
            scope.cancel();
            std::future::pending::<Infallible>().await
        };

        let session =
            SubscriptionSession::new(self.state.config.subscription.clone(), ctx);
        let run = session.run(sink.retype::<EventFrame>(), user_id, &self.state.hub, &scope);

        let stats = tokio::select! {
            result = run => result?,
            never = closed => match never {},
        };

        tracing::info!(
            session_id = self.session_id,
            heartbeats_sent = stats.heartbeats_sent,
            events_sent = stats.events_sent,
            "Subscription ended"
        );
        Ok(())
    }

    async fn serve_metrics(
        &self,
        ctx: SessionContext,
        source: Source<Request>,
        mut sink: Sink<Response>,
    ) -> Result<()> {
        sink.send(Response::Accepted).await?;

        let summary = MetricsSession::new(ctx)
            .run(
                source.retype::<MetricsFrame>(),
                sink.retype::<MetricsSummary>(),
                &self.cancel,
            )
            .await?;

        if let Some(summary) = summary {
            tracing::info!(
                session_id = self.session_id,
                total_view = summary.total_view,
                "Metrics upload ended"
            );
        }
        Ok(())
    }

    async fn serve_unary(
        &self,
        mut sink: Sink<Response>,
        authorization: Option<&str>,
        method: Method,
    ) -> Result<()> {
        let name = method.name();
        let started = Instant::now();
        tracing::info!(session_id = self.session_id, method = name, "Handling request");

        let response = match self.state.authenticator.authenticate(authorization) {
            Ok(ctx) => match self.call(&ctx, method).await {
                Ok(response) => {
                    tracing::info!(
                        session_id = self.session_id,
                        method = name,
                        duration = ?started.elapsed(),
                        "Request finished"
                    );
                    response
                }
                Err(e) => {
                    tracing::error!(
                        session_id = self.session_id,
                        method = name,
                        error = %e,
                        duration = ?started.elapsed(),
                        "Request failed"
                    );
                    Response::Error(e.to_status())
                }
            },
            Err(status) => {
                tracing::warn!(
                    session_id = self.session_id,
                    peer = %self.peer_addr,
                    "Unauthenticated request"
                );
                Response::Error(status)
            }
        };

        sink.send(response).await?;
        sink.close().await?;
        Ok(())
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        method: Method,
    ) -> std::result::Result<Response, NotesError> {
        let service = &self.state.service;
        let response = match method {
            Method::CreateNote { title, content } => {
                Response::Note(service.create_note(ctx, title, content).await?)
            }
            Method::GetNote { note_id } => Response::Note(service.get_note(note_id).await?),
            Method::GetNotes { user_id } => Response::Notes(service.get_notes(user_id).await?),
            Method::DeleteNote { note_id } => {
                service.delete_note(note_id).await?;
                Response::Deleted
            }
            Method::Chat | Method::SubscribeToEvents { .. } | Method::UploadMetrics => {
                return Err(NotesError::InvalidArgument("streaming method".into()))
            }
        };
        Ok(response)
    }
}
