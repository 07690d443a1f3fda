//! Push transports
//!
//! One trait per wire protocol. The two protocols do not share an error
//! surface upstream, so every implementation folds its failures into
//! [`Error::Transport`] before returning.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::message::{HttpMessage, HttpResponse, XmppMessage, XmppResponse};
use crate::config::GatewayConfig;
use crate::error::{Error, Result};

/// Sends downstream messages over the HTTP protocol
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send_http(&self, message: HttpMessage) -> Result<HttpResponse>;
}

/// Sends downstream messages over the XMPP protocol
#[async_trait]
pub trait XmppTransport: Send + Sync {
    async fn send_xmpp(&self, message: XmppMessage) -> Result<XmppResponse>;
}

fn transport_error(context: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport(format!("{}: request timed out", context))
    } else if err.is_connect() {
        Error::Transport(format!("{}: connection failed", context))
    } else {
        Error::Transport(format!("{}: {}", context, err))
    }
}

/// HTTP protocol client talking to the gateway's send endpoint
#[derive(Clone)]
pub struct GcmHttpClient {
    client: Client,
    endpoint: String,
    has_api_key: bool,
}

impl GcmHttpClient {
    /// Create a new client from gateway settings
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        let api_key = config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.is_empty());
        if let Some(key) = api_key {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("key={}", key))
                    .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
            );
        } else {
            warn!("No gateway API key configured; HTTP sends will fail");
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(GcmHttpClient {
            client,
            endpoint: config.http_endpoint.clone(),
            has_api_key: api_key.is_some(),
        })
    }
}

#[async_trait]
impl HttpTransport for GcmHttpClient {
    async fn send_http(&self, message: HttpMessage) -> Result<HttpResponse> {
        if !self.has_api_key {
            return Err(Error::Transport("gateway API key not configured".to_string()));
        }

        debug!(
            to = ?message.to,
            recipients = message.registration_ids.len(),
            "Sending HTTP message"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| transport_error("HTTP send", e))?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .json::<HttpResponse>()
                .await
                .map_err(|e| transport_error("HTTP response", e))?;
            info!(
                "HTTP send complete: success={}, failure={}",
                body.success, body.failure
            );
            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            match status {
                StatusCode::UNAUTHORIZED => Err(Error::Transport(
                    "gateway rejected the API key".to_string(),
                )),
                StatusCode::BAD_REQUEST => Err(Error::Transport(format!(
                    "gateway rejected the message: {}",
                    error_text.trim()
                ))),
                _ => Err(Error::Transport(format!("gateway returned {}", status))),
            }
        }
    }
}

/// XMPP protocol client that hands stanzas to the connection bridge
///
/// The bridge owns the persistent XMPP session; this client POSTs each
/// downstream stanza to `{bridge_url}/send`.
#[derive(Clone)]
pub struct BridgeXmppClient {
    client: Client,
    send_url: String,
    secret: Option<SecretString>,
}

impl BridgeXmppClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(BridgeXmppClient {
            client,
            send_url: format!("{}/send", config.bridge_url.trim_end_matches('/')),
            secret: config.bridge_secret.clone(),
        })
    }
}

#[async_trait]
impl XmppTransport for BridgeXmppClient {
    async fn send_xmpp(&self, mut message: XmppMessage) -> Result<XmppResponse> {
        message.validate()?;
        if message.message_id.is_empty() {
            message.message_id = uuid::Uuid::new_v4().to_string();
        }

        debug!(to = %message.to, message_id = %message.message_id, "Sending XMPP message");

        let mut request = self.client.post(&self.send_url).json(&message);
        if let Some(ref secret) = self.secret {
            request = request.header(crate::gateway::BRIDGE_SECRET_HEADER, secret.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error("XMPP send", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(XmppResponse {
                message_id: message.message_id,
            })
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(Error::Transport(format!(
                "bridge returned {}: {}",
                status,
                error_text.trim()
            )))
        }
    }
}
