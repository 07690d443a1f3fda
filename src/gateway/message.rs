//! Gateway wire types
//!
//! Downstream messages for the HTTP and XMPP protocols, their responses, and
//! the upstream stanza the gateway delivers from devices.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Untyped key/value payload carried by gateway messages
pub type Data = serde_json::Map<String, Value>;

/// Maximum number of recipients in one multicast HTTP message
pub const MAX_REGISTRATION_IDS: usize = 1000;

/// Delivery priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

/// Display notification payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
}

// ============================================================================
// HTTP protocol
// ============================================================================

/// Downstream message for the HTTP protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpMessage {
    /// Single recipient token or topic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Multicast recipients
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registration_ids: Vec<String>,
    /// Topic condition expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_while_idle: Option<bool>,
    /// Seconds the gateway keeps the message while the device is offline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

impl HttpMessage {
    /// Check addressing before anything goes on the wire
    pub fn validate(&self) -> Result<()> {
        let has_target = self.to.as_deref().is_some_and(|to| !to.is_empty())
            || !self.registration_ids.is_empty()
            || self.condition.as_deref().is_some_and(|c| !c.is_empty());
        if !has_target {
            return Err(Error::decode("to"));
        }
        if self.registration_ids.len() > MAX_REGISTRATION_IDS {
            return Err(Error::decode("registration_ids"));
        }
        Ok(())
    }
}

/// Per-recipient result of an HTTP send
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Canonical token replacing the one the message was sent to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Gateway response to an HTTP send
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    #[serde(default)]
    pub multicast_id: i64,
    #[serde(default)]
    pub success: u32,
    #[serde(default)]
    pub failure: u32,
    #[serde(default)]
    pub canonical_ids: u32,
    #[serde(default)]
    pub results: Vec<HttpResult>,
}

// ============================================================================
// XMPP protocol
// ============================================================================

/// Downstream message for the XMPP protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmppMessage {
    /// Recipient token or topic
    pub to: String,
    /// Unique per sender; generated when left empty
    #[serde(default)]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_receipt_requested: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

impl XmppMessage {
    /// Data message to a single recipient
    pub fn data_message(to: impl Into<String>, data: Data) -> Self {
        XmppMessage {
            to: to.into(),
            message_id: String::new(),
            message_type: None,
            collapse_key: None,
            priority: None,
            content_available: None,
            time_to_live: None,
            delivery_receipt_requested: None,
            dry_run: None,
            data: Some(data),
            notification: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(Error::decode("to"));
        }
        Ok(())
    }
}

/// Result of an XMPP send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmppResponse {
    /// ID the message was sent under
    pub message_id: String,
}

// ============================================================================
// Upstream
// ============================================================================

/// Message delivered by the gateway from a device or about a prior send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamMessage {
    /// Sending device token
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub message_id: String,
    /// `ack`, `nack`, `receipt` or `control`; absent for device data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Application package of the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
    #[serde(default)]
    pub data: Data,
}

impl UpstreamMessage {
    /// Upstream data message from a device
    pub fn data(from: impl Into<String>, data: Data) -> Self {
        UpstreamMessage {
            from: from.into(),
            message_id: String::new(),
            message_type: None,
            category: None,
            error: None,
            error_description: None,
            control_type: None,
            data,
        }
    }

    /// Device data, as opposed to gateway control traffic
    pub fn is_data_message(&self) -> bool {
        self.message_type.as_deref().map_or(true, str::is_empty)
    }
}
