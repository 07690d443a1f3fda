//! Relay core
//!
//! - command.rs: decoding upstream payloads into typed commands
//! - dispatcher.rs: applying commands to the registry and acknowledging them
//! - sender.rs: routing downstream messages to the protocol transports
//! - live.rs: optional mirror of inbound traffic to a single viewer

pub mod command;
pub mod dispatcher;
pub mod live;
pub mod sender;

pub use command::InboundCommand;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use live::LiveFeed;
pub use sender::{OutboundMessage, OutboundSender, Protocol, SendResponse};
