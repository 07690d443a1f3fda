//! Configuration I/O - Loading configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::{Config, PostgresConfig, StorageBackendType};
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    load_config_with_path(&super::paths::config_path())
}

/// Same as [`load_config`] but with an explicit file location
pub fn load_config_with_path(config_path: &Path) -> Result<Config> {
    let mut config = if config_path.exists() {
        load_config_from_path(config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        // JSON5 is more lenient than strict JSON (comments, trailing commas)
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` first, then overlays any set variables. Env vars have the
/// highest precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();

    // Server overrides
    if let Ok(bind) = std::env::var("PUSHRELAY_BIND") {
        config.server.bind = bind;
    }
    if let Ok(port) = std::env::var("PUSHRELAY_PORT") {
        if let Ok(port) = port.parse() {
            config.server.port = port;
        }
    }

    // Gateway overrides
    if let Ok(api_key) = std::env::var("GCM_API_KEY") {
        config.gateway.api_key = Some(SecretString::from(api_key));
    }
    if let Ok(sender_id) = std::env::var("GCM_SENDER_ID") {
        config.gateway.sender_id = sender_id;
    }
    if let Ok(endpoint) = std::env::var("GCM_HTTP_ENDPOINT") {
        config.gateway.http_endpoint = endpoint;
    }
    if let Ok(url) = std::env::var("GCM_BRIDGE_URL") {
        config.gateway.bridge_url = url;
    }
    if let Ok(secret) = std::env::var("GCM_BRIDGE_SECRET") {
        config.gateway.bridge_secret = Some(SecretString::from(secret));
    }
    if let Ok(timeout) = std::env::var("GCM_REQUEST_TIMEOUT") {
        if let Ok(v) = timeout.parse() {
            config.gateway.request_timeout_secs = v;
        }
    }
    if let Ok(timeout) = std::env::var("GCM_ACK_TIMEOUT") {
        if let Ok(v) = timeout.parse() {
            config.gateway.ack_timeout_secs = v;
        }
    }

    // Database overrides
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        let pg = config.storage.postgres.get_or_insert_with(|| PostgresConfig {
            url: SecretString::from(String::new()),
            max_connections: super::types::default_max_connections(),
            connect_timeout_secs: super::types::default_connect_timeout(),
        });
        pg.url = SecretString::from(database_url);
        config.storage.backend = StorageBackendType::Postgres;
    }
    if let Ok(max_conn) = std::env::var("DATABASE_MAX_CONNECTIONS") {
        if let Some(ref mut pg) = config.storage.postgres {
            if let Ok(v) = max_conn.parse() {
                pg.max_connections = v;
            }
        }
    }
    if let Ok(backend) = std::env::var("STORAGE_BACKEND") {
        if let Ok(backend) = backend.parse() {
            config.storage.backend = backend;
        }
    }

    // Logging overrides
    if let Ok(level) = std::env::var("RUST_LOG") {
        config.log.level = level;
    }
    if let Ok(format) = std::env::var("LOG_FORMAT") {
        match format.to_lowercase().as_str() {
            "json" => config.log.format = super::types::LogFormat::Json,
            "pretty" => config.log.format = super::types::LogFormat::Pretty,
            _ => {}
        }
    }
}
