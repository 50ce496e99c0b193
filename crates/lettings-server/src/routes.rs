//! Router setup with all routes and middleware.

use std::future::Future;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use lettings_core::config::LettingsConfig;
use lettings_core::error::LettingsError;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser clients served from localhost on the configured port or port+1.
    let port = state.config.server.port;
    let dev_port = port.saturating_add(1);
    let origins: Vec<HeaderValue> = [port, dev_port]
        .iter()
        .flat_map(|p| [format!("http://127.0.0.1:{}", p), format!("http://localhost:{}", p)])
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_handler))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the server on the configured address and run until `shutdown`
/// resolves.
///
/// Open connections are drained before returning; the assistant is closed
/// afterwards.
pub async fn start_server<F>(
    config: &LettingsConfig,
    state: AppState,
    shutdown: F,
) -> Result<(), LettingsError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let assistant = state.assistant.clone();
    let router = create_router(state);

    tracing::info!("Starting chat server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LettingsError::Api(format!("Failed to bind: {}", e)))?;

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| LettingsError::Api(format!("Server error: {}", e)));

    assistant.cleanup().await;
    tracing::info!("Chat server stopped");
    served
}
