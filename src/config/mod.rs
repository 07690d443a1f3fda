//! Configuration module
//!
//! - types.rs: Configuration types (Config, GatewayConfig, etc.)
//! - io.rs: Configuration loading and env overrides
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{
    Config, GatewayConfig, LogConfig, LogFormat, PostgresConfig, ServerConfig, StorageBackendType,
    StorageConfig,
};

pub use io::{apply_env_overrides, load_config, load_config_from_path, load_config_with_path};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
