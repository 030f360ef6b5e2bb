//! Realtime stream handlers
//!
//! - [`chat`]: duplex chat with correlated acknowledgements
//! - [`subscription`]: server-push note events with heartbeats
//! - [`metrics`]: client-push view counters answered with one sum
//!
//! All handlers run on any [`FrameSource`](crate::transport::FrameSource) /
//! [`FrameSink`](crate::transport::FrameSink) pair and stop when the
//! cancellation token handed to them fires.

pub mod chat;
pub mod config;
pub mod context;
pub mod metrics;
pub mod subscription;

pub use chat::ChatSession;
pub use config::{ChatConfig, SubscriptionConfig};
pub use context::SessionContext;
pub use metrics::MetricsSession;
pub use subscription::{classify_send_error, SendFailure, SubscriptionSession};
