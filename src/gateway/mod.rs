//! Gateway module - push gateway plumbing
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │        Push Gateway          │
//!            └───────┬──────────────▲───────┘
//!         HTTP proto │              │ XMPP session
//!                    │      ┌───────┴────────┐
//!                    │      │ Connection     │
//!                    │      │ Bridge         │
//!                    │      └──▲──────────┬──┘
//!                    │   /send │          │ /upstream
//!            ┌───────┴─────────┴──────────▼───────┐
//!            │              pushrelay             │
//!            │ GcmHttpClient  BridgeXmppClient    │
//!            │                GatewayListener     │
//!            └────────────────────────────────────┘
//! ```

pub mod listener;
pub mod message;
pub mod transport;

pub use listener::{inbound_channel, DeliveryError, GatewayListener, InboundSender, ListenerHandle};
pub use message::{
    Data, HttpMessage, HttpResponse, HttpResult, Notification, Priority, UpstreamMessage,
    XmppMessage, XmppResponse,
};
pub use transport::{BridgeXmppClient, GcmHttpClient, HttpTransport, XmppTransport};

/// Header carrying the shared secret between the relay and the bridge
pub const BRIDGE_SECRET_HEADER: &str = "x-bridge-secret";
