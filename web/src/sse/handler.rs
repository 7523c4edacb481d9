use crate::extractors::authenticated_user::AuthenticatedUser;
use ::sse::{StreamKind, StreamSession};
use axum::extract::State;
use axum::http::header::{HeaderName, CACHE_CONTROL};
use axum::response::sse::Sse;
use axum::response::IntoResponse;
use futures::StreamExt;
use log::*;
use service::AppState;
use std::convert::Infallible;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// GET a long-lived stream of direct messages for the authenticated user
#[utoipa::path(
    get,
    path = "/messages/stream",
    params(
        ("token" = Option<String>, Query, description = "Bearer token for clients that cannot set headers")
    ),
    responses(
        (status = 200, description = "text/event-stream of connected, message, ping and reconnect events"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub(crate) async fn message_stream(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    stream_response(&app_state, user.id.to_string(), StreamKind::Messages)
}

/// GET a long-lived stream of notifications and group messages for the authenticated user
#[utoipa::path(
    get,
    path = "/notifications/stream",
    params(
        ("token" = Option<String>, Query, description = "Bearer token for clients that cannot set headers")
    ),
    responses(
        (status = 200, description = "text/event-stream of connected, notification, group_message, ping and reconnect events"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub(crate) async fn notification_stream(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    stream_response(&app_state, user.id.to_string(), StreamKind::Notifications)
}

// The session unregisters itself when axum drops the body, so a client that
// goes away never leaves its queue behind.
fn stream_response(app_state: &AppState, user_id: String, stream: StreamKind) -> impl IntoResponse {
    debug!("Opening {stream} stream for user {user_id}");

    let session = StreamSession::open(
        app_state.broadcaster.clone(),
        user_id,
        stream,
        app_state.config.session_config(),
    );
    let events = session
        .into_stream()
        .map(|frame| Ok::<_, Infallible>(frame.into_sse_event()));

    (
        [(CACHE_CONTROL, "no-cache"), (X_ACCEL_BUFFERING, "no")],
        Sse::new(events),
    )
}
