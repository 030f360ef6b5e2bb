//! Statistics for chat sessions, event subscriptions and the server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Chat session statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Client frames read
    pub frames_received: u64,
    /// Ack frames written
    pub acks_sent: u64,
    /// Content frames written
    pub content_sent: u64,
    /// Session duration
    pub duration: Duration,
}

impl SessionStats {
    /// Total frames written to the client
    pub fn frames_sent(&self) -> u64 {
        self.acks_sent + self.content_sent
    }
}

/// Live counters shared by the loops of one chat session
#[derive(Debug)]
pub struct SessionCounters {
    started_at: Instant,
    frames_received: AtomicU64,
    acks_sent: AtomicU64,
    content_sent: AtomicU64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_received: AtomicU64::new(0),
            acks_sent: AtomicU64::new(0),
            content_sent: AtomicU64::new(0),
        }
    }

    pub fn on_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_ack_sent(&self) {
        self.acks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_content_sent(&self) {
        self.content_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            content_sent: self.content_sent.load(Ordering::Relaxed),
            duration: self.started_at.elapsed(),
        }
    }
}

impl Default for SessionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Event subscription statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Heartbeats written, including the initial one
    pub heartbeats_sent: u64,
    /// Note events written
    pub events_sent: u64,
    /// Subscription duration
    pub duration: Duration,
}

/// Server-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Total connections ever accepted
    pub total_connections: u64,
    /// Currently open connections
    pub active_connections: u64,
    /// Connections turned away at the connection limit
    pub rejected_connections: u64,
}

/// Live server counters
#[derive(Debug, Default)]
pub struct ServerCounters {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,
}

impl ServerCounters {
    pub fn on_accept(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_close(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn on_reject(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_counters_snapshot() {
        let counters = SessionCounters::new();
        counters.on_frame_received();
        counters.on_frame_received();
        counters.on_ack_sent();
        counters.on_content_sent();
        counters.on_content_sent();

        let stats = counters.snapshot();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.acks_sent, 1);
        assert_eq!(stats.content_sent, 2);
        assert_eq!(stats.frames_sent(), 3);
    }

    #[test]
    fn test_server_counters() {
        let counters = ServerCounters::default();
        counters.on_accept();
        counters.on_accept();
        counters.on_close();
        counters.on_reject();

        let stats = counters.snapshot();
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.rejected_connections, 1);
    }

    #[test]
    fn test_server_stats_default() {
        let stats = ServerStats::default();
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
    }
}
