//! Outbound sender
//!
//! Validates a downstream request and routes it to the transport for its
//! protocol. Never touches the registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gateway::{HttpMessage, HttpResponse, HttpTransport, XmppMessage, XmppResponse, XmppTransport};

/// Downstream wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Xmpp,
}

impl std::str::FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "xmpp" => Ok(Protocol::Xmpp),
            _ => Err(Error::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Xmpp => write!(f, "xmpp"),
        }
    }
}

/// Request body of `POST /message`
#[derive(Debug, Clone, Deserialize)]
pub struct OutboundMessage {
    pub protocol: String,
    /// Protocol payload, decoded once the protocol is known
    pub message: Value,
}

impl OutboundMessage {
    /// Parse a raw request body
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Transport response, returned to the caller verbatim
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SendResponse {
    Http(HttpResponse),
    Xmpp(XmppResponse),
}

/// Routes downstream messages to the protocol transports
#[derive(Clone)]
pub struct OutboundSender {
    http: Arc<dyn HttpTransport>,
    xmpp: Arc<dyn XmppTransport>,
}

impl OutboundSender {
    pub fn new(http: Arc<dyn HttpTransport>, xmpp: Arc<dyn XmppTransport>) -> Self {
        OutboundSender { http, xmpp }
    }

    /// Validate and forward one message
    pub async fn send(&self, request: OutboundMessage) -> Result<SendResponse> {
        let protocol: Protocol = request.protocol.parse()?;
        debug!(%protocol, "Routing outbound message");

        let response = match protocol {
            Protocol::Http => {
                let message: HttpMessage = decode_payload(request.message)?;
                message.validate()?;
                SendResponse::Http(self.http.send_http(message).await?)
            }
            Protocol::Xmpp => {
                let message: XmppMessage = decode_payload(request.message)?;
                message.validate()?;
                SendResponse::Xmpp(self.xmpp.send_xmpp(message).await?)
            }
        };

        info!(%protocol, "Outbound message sent");
        Ok(response)
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| {
        debug!("Message payload rejected: {}", e);
        Error::decode("message")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        http_calls: AtomicUsize,
        xmpp_calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn send_http(&self, _message: HttpMessage) -> Result<HttpResponse> {
            self.http_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Transport("gateway returned 503".into()));
            }
            Ok(HttpResponse {
                multicast_id: 1,
                success: 1,
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl XmppTransport for CountingTransport {
        async fn send_xmpp(&self, message: XmppMessage) -> Result<XmppResponse> {
            self.xmpp_calls.fetch_add(1, Ordering::SeqCst);
            Ok(XmppResponse {
                message_id: if message.message_id.is_empty() {
                    "generated".into()
                } else {
                    message.message_id
                },
            })
        }
    }

    fn sender(transport: &Arc<CountingTransport>) -> OutboundSender {
        OutboundSender::new(transport.clone(), transport.clone())
    }

    fn request(protocol: &str, message: Value) -> OutboundMessage {
        OutboundMessage {
            protocol: protocol.to_string(),
            message,
        }
    }

    #[test]
    fn test_protocol_parsing_is_case_insensitive() {
        assert_eq!("HTTP".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!("Xmpp".parse::<Protocol>().unwrap(), Protocol::Xmpp);
        assert!(matches!(
            "ftp".parse::<Protocol>(),
            Err(Error::UnsupportedProtocol(_))
        ));
    }

    #[tokio::test]
    async fn test_mixed_case_http_routes_to_http_transport() {
        let transport = Arc::new(CountingTransport::default());
        let response = sender(&transport)
            .send(request("HTTP", json!({ "to": "device" })))
            .await
            .unwrap();

        assert!(matches!(response, SendResponse::Http(ref r) if r.success == 1));
        assert_eq!(transport.http_calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.xmpp_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_xmpp_routes_to_xmpp_transport() {
        let transport = Arc::new(CountingTransport::default());
        let response = sender(&transport)
            .send(request("xmpp", json!({ "to": "device", "message_id": "m-1" })))
            .await
            .unwrap();

        assert_eq!(
            response,
            SendResponse::Xmpp(XmppResponse {
                message_id: "m-1".into()
            })
        );
        assert_eq!(transport.xmpp_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_protocol_invokes_no_transport() {
        let transport = Arc::new(CountingTransport::default());
        let err = sender(&transport)
            .send(request("ftp", json!({ "to": "device" })))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedProtocol(_)));
        assert_eq!(transport.http_calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.xmpp_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_payload_is_decode_error() {
        let transport = Arc::new(CountingTransport::default());
        let err = sender(&transport)
            .send(request("xmpp", json!({ "data": "not-a-map" })))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode { ref field } if field == "message"));
        assert_eq!(transport.xmpp_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_propagated() {
        let transport = Arc::new(CountingTransport {
            fail: true,
            ..Default::default()
        });
        let err = sender(&transport)
            .send(request("http", json!({ "to": "device" })))
            .await
            .unwrap_err();

        assert!(err.is_transport_error());
    }

    #[test]
    fn test_malformed_body_is_json_error() {
        assert!(matches!(
            OutboundMessage::from_slice(b"{\"protocol\": "),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            OutboundMessage::from_slice(br#"{"message": {}}"#),
            Err(Error::Json(_))
        ));
    }
}
