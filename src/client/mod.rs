//! Client implementations
//!
//! - [`ChatClient`]: duplex chat with correlated acknowledgements
//! - [`EventSubscriber`]: created-note events and heartbeats
//! - [`NotesClient`]: unary note calls and metrics upload

pub mod chat;
pub mod config;
mod connector;
pub mod events;
pub mod notes;

pub use chat::{ChatClient, ChatEvent};
pub use config::ClientConfig;
pub use events::{EventSubscriber, SubscriberEvent};
pub use notes::NotesClient;
