//! Route handlers
//!
//! Bodies are taken as raw bytes and parsed here so each route controls its
//! own status for malformed input.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use futures::stream::{self, Stream};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::AppState;
use crate::error::Error;
use crate::gateway::{UpstreamMessage, BRIDGE_SECRET_HEADER};
use crate::relay::OutboundMessage;

/// Body of `POST /clients`
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub registration_token: String,
    #[serde(default)]
    pub string_identifier: Option<String>,
}

/// `GET /health`
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": crate::NAME,
            "version": crate::VERSION,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// `GET /clients`
pub async fn list_clients(State(state): State<AppState>) -> Response {
    match state.registry.list().await {
        Ok(clients) => (StatusCode::OK, Json(json!({ "clients": clients }))).into_response(),
        Err(e) => {
            warn!("Listing clients failed: {}", e);
            ApiError::bare(StatusCode::NOT_FOUND).into_response()
        }
    }
}

/// `POST /clients`
pub async fn create_client(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let invalid = |e: Error| ApiError::from_error(e, StatusCode::NOT_ACCEPTABLE);

    let request: CreateClientRequest = serde_json::from_slice(&body).map_err(|e| invalid(e.into()))?;
    if request.registration_token.is_empty() {
        return Err(invalid(Error::decode("registration_token")));
    }

    let (record, created) = state
        .registry
        .register(&request.registration_token, request.string_identifier)
        .await
        .map_err(invalid)?;
    info!(token = %record.registration_token, created, "Client saved over HTTP");

    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// `DELETE /clients/{registration_token}`
pub async fn delete_client(
    State(state): State<AppState>,
    Path(registration_token): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.registry.unregister(&registration_token).await {
        Ok(()) => {
            info!(token = %registration_token, "Client deleted over HTTP");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(Error::NotFound(_)) => Err(ApiError::bare(StatusCode::NOT_FOUND)),
        Err(e) => Err(ApiError::from_error(e, StatusCode::NOT_ACCEPTABLE)),
    }
}

/// `POST /message`
pub async fn send_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let unprocessable = |e: Error| ApiError::from_error(e, StatusCode::UNPROCESSABLE_ENTITY);

    let request = OutboundMessage::from_slice(&body).map_err(unprocessable)?;

    // Detached so a caller hanging up cannot abort a send already on the wire
    let sender = state.sender.clone();
    let response = tokio::spawn(async move { sender.send(request).await })
        .await
        .map_err(|e| unprocessable(Error::Internal(format!("send task failed: {}", e))))?
        .map_err(unprocessable)?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// `POST /upstream`, called by the connection bridge for every inbound stanza
pub async fn receive_upstream(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if let Some(secret) = &state.bridge_secret {
        let presented = headers
            .get(BRIDGE_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(secret.expose_secret()) {
            warn!("Rejected upstream delivery with bad bridge secret");
            return Err(ApiError::new(StatusCode::UNAUTHORIZED, "invalid bridge secret"));
        }
    }

    let message: UpstreamMessage = serde_json::from_slice(&body).map_err(|e| {
        debug!("Malformed upstream stanza: {}", e);
        ApiError::new(StatusCode::BAD_REQUEST, format!("malformed upstream message: {}", e))
    })?;
    let message_id = message.message_id.clone();

    match state.inbound.deliver(message) {
        Ok(()) => {
            debug!(message_id = %message_id, "Upstream message queued");
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({ "status": "accepted", "message_id": message_id })),
            )
                .into_response())
        }
        Err(e) => {
            warn!(message_id = %message_id, "Upstream message refused: {}", e);
            Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
    }
}

/// `GET /live`, Server-Sent Events mirror of upstream traffic
pub async fn live_feed(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let viewer = state.live.attach();
    info!("Live viewer attached");

    let stream = stream::unfold(viewer, |mut viewer| async move {
        let message = viewer.recv().await?;
        let event = match Event::default().event("upstream_message").json_data(&message) {
            Ok(event) => event,
            Err(e) => {
                warn!("Failed to encode live event: {}", e);
                Event::default().comment("dropped")
            }
        };
        Some((Ok(event), viewer))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keepalive"),
    )
}
