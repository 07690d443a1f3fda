//! HTTP surface of the relay
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/health` | GET | liveness |
//! | `/clients` | GET, POST | list / register devices |
//! | `/clients/{registration_token}` | DELETE | remove a device |
//! | `/message` | POST | push a downstream message |
//! | `/upstream` | POST | inbound stanzas from the connection bridge |
//! | `/live` | GET | SSE mirror of inbound traffic |

pub mod error;
pub mod handlers;

pub use error::ApiError;

use axum::{
    routing::{delete, get, post},
    Router,
};
use secrecy::SecretString;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use tracing::info;

use crate::gateway::InboundSender;
use crate::registry::Registry;
use crate::relay::{LiveFeed, OutboundSender};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub sender: OutboundSender,
    pub live: LiveFeed,
    pub inbound: InboundSender,
    /// Required value of the bridge secret header, when set
    pub bridge_secret: Option<SecretString>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route(
            "/clients/{registration_token}",
            delete(handlers::delete_client),
        )
        .route("/message", post(handlers::send_message))
        .route("/upstream", post(handlers::receive_upstream))
        .route("/live", get(handlers::live_feed))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router until `shutdown` resolves.
///
/// Graceful shutdown waits for open connections, so the live viewer is
/// detached first to end its event stream.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let live = state.live.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            if live.is_attached() {
                info!("Closing live viewer for shutdown");
            }
            live.detach();
        })
        .await?;
    Ok(())
}
