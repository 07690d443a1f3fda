//! Configuration types
//!
//! Every section carries serde defaults so a partial file (or no file at all)
//! still yields a usable configuration.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Push gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Registry storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4260
}

/// Push gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Sender ID (project number) registered with the gateway
    #[serde(default)]
    pub sender_id: String,
    /// Server API key
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
    /// Downstream HTTP protocol endpoint
    #[serde(default = "default_http_endpoint")]
    pub http_endpoint: String,
    /// Base URL of the XMPP connection bridge
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Shared secret the bridge presents on `/upstream`
    #[serde(default, skip_serializing)]
    pub bridge_secret: Option<SecretString>,
    /// Timeout for outbound sends, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for acknowledgment sends, in seconds
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,
    /// Capacity of the inbound event queue
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            sender_id: String::new(),
            api_key: None,
            http_endpoint: default_http_endpoint(),
            bridge_url: default_bridge_url(),
            bridge_secret: None,
            request_timeout_secs: default_request_timeout(),
            ack_timeout_secs: default_ack_timeout(),
            inbound_buffer: default_inbound_buffer(),
        }
    }
}

fn default_http_endpoint() -> String {
    "https://gcm-http.googleapis.com/gcm/send".to_string()
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:5236".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_ack_timeout() -> u64 {
    10
}

fn default_inbound_buffer() -> usize {
    256
}

/// Registry storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StorageBackendType,
    /// PostgreSQL configuration
    pub postgres: Option<PostgresConfig>,
}

/// Storage backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendType {
    /// In-memory (no persistence)
    #[default]
    Memory,
    /// PostgreSQL
    Postgres,
}

impl std::str::FromStr for StorageBackendType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackendType::Memory),
            "postgres" | "postgresql" => Ok(StorageBackendType::Postgres),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid storage backend: {}. Valid options: memory, postgres",
                s
            ))),
        }
    }
}

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Database URL
    #[serde(skip_serializing)]
    pub url: SecretString,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

pub(crate) fn default_max_connections() -> u32 {
    5
}

pub(crate) fn default_connect_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info,pushrelay=debug,sqlx=warn".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.port, 4260);
        assert_eq!(config.storage.backend, StorageBackendType::Memory);
        assert_eq!(config.gateway.ack_timeout_secs, 10);
        assert!(config.gateway.api_key.is_none());
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!(
            "Postgres".parse::<StorageBackendType>().unwrap(),
            StorageBackendType::Postgres
        );
        assert_eq!(
            "memory".parse::<StorageBackendType>().unwrap(),
            StorageBackendType::Memory
        );
        assert!("sqlite".parse::<StorageBackendType>().is_err());
    }
}
