//! Server configuration
//!
//! Built in code with the builder setters, or loaded from TOML:
//!
//! ```toml
//! bind_addr = "0.0.0.0:50051"
//! max_connections = 50
//! log_level = "info"
//! log_format = "json"
//!
//! [auth]
//! token = "secret"
//! user_id = 1
//!
//! [chat]
//! content_interval_ms = 500
//!
//! [subscription]
//! heartbeat_interval_ms = 5000
//! ```
//!
//! `NOTES_*` environment variables override file values.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::logging::LogFormat;
use crate::protocol::constants::{DEFAULT_MAX_FRAME_LENGTH, DEFAULT_PORT};
use crate::session::{ChatConfig, SubscriptionConfig};

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// The opening request must arrive within this time
    pub handshake_timeout: Duration,

    /// Largest accepted frame in bytes
    pub max_frame_length: usize,

    /// Enable TCP_NODELAY
    pub tcp_nodelay: bool,

    /// Bearer token accepted for unary calls (None = generated at startup)
    pub auth_token: Option<String>,

    /// User the bearer token authenticates as
    pub auth_user_id: i64,

    /// Chat session tuning
    pub chat: ChatConfig,

    /// Event subscription tuning
    pub subscription: SubscriptionConfig,

    /// Default log filter directive
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 50,
            handshake_timeout: Duration::from_secs(10),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            tcp_nodelay: true,
            auth_token: None,
            auth_user_id: 1,
            chat: ChatConfig::default(),
            subscription: SubscriptionConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the maximum frame length
    pub fn max_frame_length(mut self, len: usize) -> Self {
        self.max_frame_length = len.max(1);
        self
    }

    /// Set the bearer token and the user it maps to
    pub fn auth(mut self, token: impl Into<String>, user_id: i64) -> Self {
        self.auth_token = Some(token.into());
        self.auth_user_id = user_id;
        self
    }

    /// Set chat session options
    pub fn chat(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    /// Set subscription options
    pub fn subscription(mut self, subscription: SubscriptionConfig) -> Self {
        self.subscription = subscription;
        self
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(s)?;
        Ok(file.apply(Self::default()))
    }

    /// Load a TOML file and apply `NOTES_*` environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)?.with_env_overrides()
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("NOTES_BIND_ADDR") {
            self.bind_addr = parse_value("NOTES_BIND_ADDR", value)?;
        }
        if let Some(value) = lookup("NOTES_MAX_CONNECTIONS") {
            self.max_connections = parse_value("NOTES_MAX_CONNECTIONS", value)?;
        }
        if let Some(value) = lookup("NOTES_AUTH_TOKEN") {
            self.auth_token = Some(value);
        }
        if let Some(value) = lookup("NOTES_LOG_LEVEL") {
            self.log_level = value;
        }
        if let Some(value) = lookup("NOTES_LOG_FORMAT") {
            self.log_format = parse_value("NOTES_LOG_FORMAT", value)?;
        }
        Ok(self)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// On-disk layout; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    bind_addr: Option<SocketAddr>,
    max_connections: Option<usize>,
    handshake_timeout_ms: Option<u64>,
    max_frame_length: Option<usize>,
    tcp_nodelay: Option<bool>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
    auth: AuthSection,
    chat: ChatSection,
    subscription: SubscriptionSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AuthSection {
    token: Option<String>,
    user_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ChatSection {
    content_interval_ms: Option<u64>,
    ack_queue_capacity: Option<usize>,
    outbound_queue_capacity: Option<usize>,
    write_timeout_ms: Option<u64>,
    phrases: Option<Vec<String>>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SubscriptionSection {
    heartbeat_interval_ms: Option<u64>,
}

impl ConfigFile {
    fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(addr) = self.bind_addr {
            config = config.bind(addr);
        }
        if let Some(max) = self.max_connections {
            config = config.max_connections(max);
        }
        if let Some(ms) = self.handshake_timeout_ms {
            config = config.handshake_timeout(Duration::from_millis(ms));
        }
        if let Some(len) = self.max_frame_length {
            config = config.max_frame_length(len);
        }
        if let Some(nodelay) = self.tcp_nodelay {
            config.tcp_nodelay = nodelay;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        if let Some(token) = self.auth.token {
            config.auth_token = Some(token);
        }
        if let Some(user_id) = self.auth.user_id {
            config.auth_user_id = user_id;
        }

        let mut chat = config.chat;
        if let Some(ms) = self.chat.content_interval_ms {
            chat = chat.content_interval(Duration::from_millis(ms));
        }
        if let Some(capacity) = self.chat.ack_queue_capacity {
            chat = chat.ack_queue_capacity(capacity);
        }
        if let Some(capacity) = self.chat.outbound_queue_capacity {
            chat = chat.outbound_queue_capacity(capacity);
        }
        if let Some(ms) = self.chat.write_timeout_ms {
            chat = chat.write_timeout(Duration::from_millis(ms));
        }
        if let Some(phrases) = self.chat.phrases {
            chat = chat.phrases(phrases);
        }
        if let Some(seed) = self.chat.seed {
            chat = chat.seed(seed);
        }
        config.chat = chat;

        if let Some(ms) = self.subscription.heartbeat_interval_ms {
            config.subscription = config
                .subscription
                .heartbeat_interval(Duration::from_millis(ms));
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 50051);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.max_frame_length, DEFAULT_MAX_FRAME_LENGTH);
        assert!(config.tcp_nodelay);
        assert!(config.auth_token.is_none());
        assert_eq!(config.chat.content_interval, Duration::from_millis(500));
        assert_eq!(config.subscription.heartbeat_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:6000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(5)
            .handshake_timeout(Duration::from_secs(2))
            .max_frame_length(0)
            .auth("token", 7);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.handshake_timeout, Duration::from_secs(2));
        assert_eq!(config.max_frame_length, 1);
        assert_eq!(config.auth_token.as_deref(), Some("token"));
        assert_eq!(config.auth_user_id, 7);
    }

    #[test]
    fn test_from_toml_str() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:7000"
            max_connections = 3
            log_format = "json"

            [auth]
            token = "abc"
            user_id = 9

            [chat]
            content_interval_ms = 250
            write_timeout_ms = 2000
            phrases = ["one", "two"]
            seed = 42

            [subscription]
            heartbeat_interval_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.auth_token.as_deref(), Some("abc"));
        assert_eq!(config.auth_user_id, 9);
        assert_eq!(config.chat.content_interval, Duration::from_millis(250));
        assert_eq!(config.chat.write_timeout, Duration::from_secs(2));
        assert_eq!(config.chat.phrases, vec!["one", "two"]);
        assert_eq!(config.chat.seed, Some(42));
        assert_eq!(config.subscription.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ServerConfig::from_toml_str("chunk_size = 4096").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NOTES_BIND_ADDR", "127.0.0.1:9000"),
            ("NOTES_MAX_CONNECTIONS", "8"),
            ("NOTES_AUTH_TOKEN", "from-env"),
            ("NOTES_LOG_FORMAT", "compact"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::default()
            .with_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.auth_token.as_deref(), Some("from-env"));
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = ServerConfig::default()
            .with_overrides_from(|key| (key == "NOTES_MAX_CONNECTIONS").then(|| "many".to_string()))
            .unwrap_err();

        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "NOTES_MAX_CONNECTIONS");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load("/nonexistent/notes.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
