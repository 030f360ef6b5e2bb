//! Notes server listener
//!
//! Handles the TCP accept loop and spawns connection handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::auth::{Authenticator, StaticTokenAuthenticator};
use crate::error::Result;
use crate::hub::EventHub;
use crate::notes::{MemoryNoteRepository, NoteRepository, NoteService};
use crate::server::config::ServerConfig;
use crate::server::connection::{Connection, ServerState};
use crate::stats::{ServerCounters, ServerStats};

/// Notes server
pub struct NotesServer<R: NoteRepository = MemoryNoteRepository> {
    state: Arc<ServerState<R>>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    counters: Arc<ServerCounters>,
    shutdown: CancellationToken,
}

impl NotesServer<MemoryNoteRepository> {
    /// Create a server with in-memory note storage
    pub fn new(config: ServerConfig) -> Self {
        Self::with_repository(config, MemoryNoteRepository::new())
    }
}

impl<R: NoteRepository> NotesServer<R> {
    /// Create a server over a custom repository
    ///
    /// Unary calls are checked against the configured bearer token. Without
    /// one a random token is generated and logged.
    pub fn with_repository(config: ServerConfig, repository: R) -> Self {
        let token = config
            .auth_token
            .clone()
            .unwrap_or_else(|| {
                let token = uuid::Uuid::new_v4().to_string();
                tracing::info!(token = %token, user_id = config.auth_user_id, "Generated auth token");
                token
            });
        let authenticator = StaticTokenAuthenticator::new(token, config.auth_user_id);

        Self::with_authenticator(config, repository, authenticator)
    }

    /// Create a server with a custom authenticator
    pub fn with_authenticator<A: Authenticator>(
        config: ServerConfig,
        repository: R,
        authenticator: A,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let hub = Arc::new(EventHub::new());
        let service = NoteService::new(repository, Arc::clone(&hub));

        Self {
            state: Arc::new(ServerState {
                config,
                hub,
                service,
                authenticator: Arc::new(authenticator),
            }),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            counters: Arc::new(ServerCounters::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Event hub shared by every subscription
    pub fn hub(&self) -> &Arc<EventHub> {
        &self.state.hub
    }

    /// Note service backing the unary methods
    pub fn service(&self) -> &NoteService<R> {
        &self.state.service
    }

    /// Connection statistics
    pub fn stats(&self) -> ServerStats {
        self.counters.snapshot()
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.state.config.bind_addr
    }

    /// Token cancelled when the server shuts down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` resolves
    ///
    /// On shutdown every open chat session and subscription is cancelled and
    /// awaited before this returns.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Notes server listening");

        let mut tasks = JoinSet::new();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            _ = self.shutdown.cancelled() => Ok(()),
            result = self.accept_loop(&listener, &mut tasks) => result,
        };

        self.shutdown.cancel();
        while tasks.join_next().await.is_some() {}

        tracing::info!(addr = %addr, "Notes server stopped");
        result
    }

    async fn accept_loop(&self, listener: &TcpListener, tasks: &mut JoinSet<()>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.handle_connection(socket, peer_addr, tasks),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr, tasks: &mut JoinSet<()>) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.counters.on_reject();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.state.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        self.counters.on_accept();

        let counters = Arc::clone(&self.counters);
        let connection = Connection::new(
            session_id,
            peer_addr,
            Arc::clone(&self.state),
            self.shutdown.child_token(),
        );

        tasks.spawn(async move {
            let _permit = permit;

            match connection.run(socket).await {
                Ok(()) => {}
                Err(e) if e.is_graceful() => {
                    tracing::debug!(session_id = session_id, error = %e, "Connection ended");
                }
                Err(e) => {
                    tracing::error!(session_id = session_id, error = %e, "Connection error");
                }
            }

            counters.on_close();
            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}
