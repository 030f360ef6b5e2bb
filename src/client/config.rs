//! Client configuration

use std::time::Duration;

use crate::protocol::constants::{DEFAULT_MAX_FRAME_LENGTH, DEFAULT_PORT};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address as `host:port`
    pub addr: String,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Largest accepted frame in bytes
    pub max_frame_length: usize,

    /// Full `authorization` value sent with requests, e.g. `Bearer <token>`
    pub authorization: Option<String>,

    /// Capacity of the event channel returned by streaming clients
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            connect_timeout: Duration::from_secs(10),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            authorization: None,
            event_buffer: 256,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given server address
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Authenticate with a bearer token
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.authorization = Some(format!("Bearer {}", token.as_ref()));
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the event channel capacity (at least 1)
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.addr, "127.0.0.1:50051");
        assert!(config.authorization.is_none());
    }

    #[test]
    fn test_bearer_token() {
        let config = ClientConfig::new("localhost:1").bearer_token("abc");
        assert_eq!(config.authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(config.addr, "localhost:1");
    }
}
