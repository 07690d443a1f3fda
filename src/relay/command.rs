//! Inbound command decoding
//!
//! The gateway delivers device data as a weakly-typed map. It is decoded here,
//! once, into [`InboundCommand`]; nothing past this point sees the raw map.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::gateway::Data;

pub const ACTION_KEY: &str = "action";
pub const REGISTER_NEW_CLIENT: &str = "register_new_client";
pub const UNREGISTER_CLIENT: &str = "unregister_client";
pub const TOKEN_KEY: &str = "registration_token";
pub const STRING_IDENTIFIER_KEY: &str = "stringIdentifier";
pub const STATUS_KEY: &str = "status";
pub const STATUS_REGISTERED: &str = "registered";
pub const STATUS_UNREGISTERED: &str = "unregistered";

/// A typed command decoded from an upstream payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Create or relabel a device
    Register { token: String, label: String },
    /// Remove a device
    Unregister { token: String },
    /// Traffic with no action this relay handles
    Unknown,
}

impl InboundCommand {
    /// Decode a payload. Unknown or missing actions are not errors.
    pub fn decode(data: &Data) -> Result<Self> {
        let action = data.get(ACTION_KEY).and_then(Value::as_str);

        match action {
            Some(REGISTER_NEW_CLIENT) => Ok(InboundCommand::Register {
                token: required_token(data)?,
                label: required_string(data, STRING_IDENTIFIER_KEY, STRING_IDENTIFIER_KEY)?,
            }),
            Some(UNREGISTER_CLIENT) => Ok(InboundCommand::Unregister {
                token: required_token(data)?,
            }),
            _ => Ok(InboundCommand::Unknown),
        }
    }

    /// Action string this command answers to
    pub fn action(&self) -> Option<&'static str> {
        match self {
            InboundCommand::Register { .. } => Some(REGISTER_NEW_CLIENT),
            InboundCommand::Unregister { .. } => Some(UNREGISTER_CLIENT),
            InboundCommand::Unknown => None,
        }
    }
}

/// Tokens key the registry, so an empty one is as malformed as a missing one
fn required_token(data: &Data) -> Result<String> {
    let token = required_string(data, TOKEN_KEY, "token")?;
    if token.is_empty() {
        return Err(Error::decode("token"));
    }
    Ok(token)
}

fn required_string(data: &Data, key: &str, field: &str) -> Result<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::decode(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Data {
        serde_json::from_value(value).unwrap()
    }

    fn decode_field_error(value: Value) -> String {
        match InboundCommand::decode(&data(value)) {
            Err(Error::Decode { field }) => field,
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_register() {
        let command = InboundCommand::decode(&data(json!({
            "action": "register_new_client",
            "registration_token": "T2",
            "stringIdentifier": "B"
        })))
        .unwrap();

        assert_eq!(
            command,
            InboundCommand::Register {
                token: "T2".into(),
                label: "B".into()
            }
        );
        assert_eq!(command.action(), Some(REGISTER_NEW_CLIENT));
    }

    #[test]
    fn test_decode_unregister() {
        let command = InboundCommand::decode(&data(json!({
            "action": "unregister_client",
            "registration_token": "T2"
        })))
        .unwrap();
        assert_eq!(command, InboundCommand::Unregister { token: "T2".into() });
    }

    #[test]
    fn test_unknown_actions_are_ignored() {
        assert_eq!(
            InboundCommand::decode(&data(json!({}))).unwrap(),
            InboundCommand::Unknown
        );
        assert_eq!(
            InboundCommand::decode(&data(json!({ "action": "ping" }))).unwrap(),
            InboundCommand::Unknown
        );
        assert_eq!(
            InboundCommand::decode(&data(json!({ "action": 7 }))).unwrap(),
            InboundCommand::Unknown
        );
    }

    #[test]
    fn test_missing_or_mistyped_fields_name_the_field() {
        assert_eq!(
            decode_field_error(json!({
                "action": "register_new_client",
                "stringIdentifier": "B"
            })),
            "token"
        );
        assert_eq!(
            decode_field_error(json!({
                "action": "register_new_client",
                "registration_token": "T2",
                "stringIdentifier": 12
            })),
            "stringIdentifier"
        );
        assert_eq!(
            decode_field_error(json!({
                "action": "unregister_client",
                "registration_token": ["T2"]
            })),
            "token"
        );
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert_eq!(
            decode_field_error(json!({
                "action": "register_new_client",
                "registration_token": "",
                "stringIdentifier": "B"
            })),
            "token"
        );
        assert_eq!(
            decode_field_error(json!({
                "action": "unregister_client",
                "registration_token": ""
            })),
            "token"
        );
    }
}
