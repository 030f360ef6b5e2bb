//! Notes server
//!
//! ```text
//!            TcpListener
//!                 │
//!          ┌──────┴──────┐ one task per connection
//!          ▼             ▼
//!     Connection     Connection ── opening Request
//!          │
//!   ┌──────┼────────────────┐
//!   ▼      ▼                ▼
//!  Chat  SubscribeToEvents  unary (create/get/list/delete)
//!   │      │                │
//!   │      └── EventHub ◄───┴── NoteService::create_note
//!   ▼
//!  ChatSession
//! ```

pub mod config;
mod connection;
mod listener;

pub use config::{ConfigError, ServerConfig};
pub use listener::NotesServer;
