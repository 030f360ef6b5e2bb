//! Per-stream tuning

use std::time::Duration;

use crate::protocol::constants::{
    CANNED_PHRASES, DEFAULT_ACK_QUEUE_CAPACITY, DEFAULT_CONTENT_INTERVAL,
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_OUTBOUND_QUEUE_CAPACITY, DEFAULT_WRITE_TIMEOUT,
};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Chat session options
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Interval between synthetic content frames
    pub content_interval: Duration,

    /// Correlation ids buffered between the receive and ack loops.
    /// The receive loop waits when the buffer is full.
    pub ack_queue_capacity: usize,

    /// Frames buffered ahead of the writer
    pub outbound_queue_capacity: usize,

    /// Bound on one frame write; a started frame is always finished or
    /// times out, never abandoned halfway
    pub write_timeout: Duration,

    /// Phrase pool for content frames (empty disables content frames)
    pub phrases: Vec<String>,

    /// Seed for phrase selection (None = seeded from the OS)
    pub seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            content_interval: DEFAULT_CONTENT_INTERVAL,
            ack_queue_capacity: DEFAULT_ACK_QUEUE_CAPACITY,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            phrases: CANNED_PHRASES.iter().map(|p| p.to_string()).collect(),
            seed: None,
        }
    }
}

impl ChatConfig {
    /// Set the content interval
    pub fn content_interval(mut self, interval: Duration) -> Self {
        self.content_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Set the per-frame write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout.max(MIN_INTERVAL);
        self
    }

    /// Set the ack queue capacity (at least 1)
    pub fn ack_queue_capacity(mut self, capacity: usize) -> Self {
        self.ack_queue_capacity = capacity.max(1);
        self
    }

    /// Set the outbound queue capacity (at least 1)
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Replace the phrase pool
    pub fn phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Use a fixed seed for phrase selection
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Apply the builder floors to values set through the public fields
    pub(crate) fn clamped(self) -> Self {
        let content_interval = self.content_interval;
        let ack_queue_capacity = self.ack_queue_capacity;
        let outbound_queue_capacity = self.outbound_queue_capacity;
        let write_timeout = self.write_timeout;

        self.content_interval(content_interval)
            .ack_queue_capacity(ack_queue_capacity)
            .outbound_queue_capacity(outbound_queue_capacity)
            .write_timeout(write_timeout)
    }
}

/// Event subscription options
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// Interval between heartbeats after the initial one
    pub heartbeat_interval: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

impl SubscriptionConfig {
    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval.max(MIN_INTERVAL);
        self
    }

    pub(crate) fn clamped(self) -> Self {
        let interval = self.heartbeat_interval;
        self.heartbeat_interval(interval)
    }
}
