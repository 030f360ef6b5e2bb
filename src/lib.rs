//! Realtime core of a notes backend
//!
//! Two kinds of long-lived streams sit next to plain note CRUD calls:
//!
//! - **Chat**: a duplex stream where every client frame is acknowledged by
//!   its correlation id while the server pushes content on a timer
//!   ([`session::ChatSession`]).
//! - **Event subscriptions**: a server-push stream carrying "note created"
//!   signals from the [`hub::EventHub`] interleaved with heartbeats
//!   ([`session::SubscriptionSession`]).
//!
//! Sessions only see [`transport::FrameSource`] / [`transport::FrameSink`],
//! so they run over TCP via [`server::NotesServer`] or over in-process
//! channels.
//!
//! # Example
//! ```no_run
//! use notes_rt::server::{NotesServer, ServerConfig};
//!
//! # async fn example() -> notes_rt::error::Result<()> {
//! let config = ServerConfig::default().auth("secret", 1);
//! let server = NotesServer::new(config);
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod hub;
pub mod logging;
pub mod notes;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stats;
pub mod transport;

pub use error::{Error, Result};
pub use hub::EventHub;
pub use server::{NotesServer, ServerConfig};
pub use session::{ChatSession, MetricsSession, SubscriptionSession};
