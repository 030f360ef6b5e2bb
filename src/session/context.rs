//! Session context
//!
//! Context handed to the stream handlers. It carries the session identity,
//! the authenticated request context, and the tracing span every loop of the
//! session logs through.

use std::net::SocketAddr;

use tracing::Span;

use crate::auth::RequestContext;

/// Context for one chat session or event subscription
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session ID
    pub session_id: u64,

    /// Remote peer address (None for in-process streams)
    pub peer_addr: Option<SocketAddr>,

    /// Caller identity established by the authenticator
    pub request: RequestContext,

    span: Span,
}

impl SessionContext {
    /// Create a new context with its own `session` span
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            peer_addr: None,
            request: RequestContext::anonymous(),
            span: tracing::info_span!("session", session_id = session_id),
        }
    }

    /// Create a context for a remote peer
    pub fn with_peer(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr: Some(peer_addr),
            request: RequestContext::anonymous(),
            span: tracing::info_span!("session", session_id = session_id, peer = %peer_addr),
        }
    }

    /// Attach the request context
    pub fn request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    /// Log through `span` instead of the default one
    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Span the session's loops are instrumented with
    pub fn tracing_span(&self) -> &Span {
        &self.span
    }
}
