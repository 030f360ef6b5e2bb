//! Session, subscription and server statistics

pub mod metrics;

pub use metrics::{
    ServerCounters, ServerStats, SessionCounters, SessionStats, SubscriptionStats,
};
