use log::*;
use service::AppState;
use tokio::net::TcpListener;
use tokio::signal;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::CorsLayer;

mod controller;
mod error;
mod extractors;
mod params;
mod protect;
mod router;
mod sse;

pub use self::error::{Error, Result};

/// Serves the API until Ctrl-C (or SIGTERM on unix). Before the server stops
/// accepting work every open event stream is told to `reconnect`, so clients
/// come back to the next instance instead of waiting on a dead socket.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{interface}:{}", app_state.config.port);

    let listener = TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    let cors_layer = cors_layer(&app_state.config.allowed_origins);
    let broadcaster = app_state.broadcaster.clone();

    let router = router::define_routes(app_state).layer(cors_layer);

    axum::serve(listener, router)
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!(
            "Asking {} open event stream(s) to reconnect",
            broadcaster.connection_count(None)
        );
        broadcaster.broadcast_to_all(
            "reconnect",
            &serde_json::json!({ "reason": "server_shutdown" }),
        );
    })
    .await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect::<Vec<HeaderValue>>();
    info!("Allowed CORS origins: {allowed_origins:?}");

    CorsLayer::new()
        .allow_methods([Method::DELETE, Method::GET, Method::POST, Method::PUT])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_origin(origins)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
