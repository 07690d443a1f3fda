//! # pushrelay
//!
//! Relays push-notification traffic between a cloud messaging gateway and a
//! registry of subscribed client devices.
//!
//! ## Features
//!
//! - **Device Registry:** Idempotent register/unregister keyed by registration token
//! - **Inbound Dispatch:** Upstream gateway messages decoded into typed commands and acknowledged
//! - **Outbound Routing:** Downstream pushes over the HTTP or XMPP gateway protocol
//! - **Live Feed:** Optional Server-Sent-Events mirror of inbound gateway traffic

pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod relay;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
