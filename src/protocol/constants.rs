//! Protocol constants and reference values

use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 50051;

/// Cadence of synthetic chat content
pub const DEFAULT_CONTENT_INTERVAL: Duration = Duration::from_millis(500);

/// Cadence of subscription heartbeats
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Pending acknowledgements buffered per chat session
pub const DEFAULT_ACK_QUEUE_CAPACITY: usize = 64;

/// Outbound frames buffered ahead of a session's writer
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Longest a single frame write may take once it has started
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted frame payload (1 MiB)
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Canned phrases pushed to chat clients
pub const CANNED_PHRASES: [&str; 10] = [
    "hello",
    "how are you?",
    "how does going?",
    "okey",
    "stay in touch",
    "nice to meet you",
    "good morning",
    "afternoon!",
    "hi, fellas!",
    "hello, people!",
];
