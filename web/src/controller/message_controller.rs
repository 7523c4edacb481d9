use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::message::SendMessageParams;
use crate::Error;
use domain::{message as MessageApi, Id};
use log::*;
use service::AppState;

/// POST send a direct message to another user
#[utoipa::path(
    post,
    path = "/messages",
    request_body = SendMessageParams,
    responses(
        (status = 201, description = "Successfully sent a new Message", body = domain::messages::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Receiver not found"),
        (status = 422, description = "Unprocessable Entity"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(params): Json<SendMessageParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Send a Message from {} to {}", user.id, params.receiver_id);

    let message = MessageApi::send(
        app_state.db_conn_ref(),
        &app_state.event_dispatcher,
        user.id,
        params.receiver_id,
        params.content,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), message)),
    ))
}

/// GET the conversation between the authenticated user and another user
#[utoipa::path(
    get,
    path = "/messages/conversations/{user_id}",
    params(
        ("user_id" = String, Path, description = "The other participant of the conversation")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the conversation, oldest message first", body = [domain::messages::Model]),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn index(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(other_user_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Conversation between {} and {other_user_id}", user.id);

    let messages =
        MessageApi::find_conversation(app_state.db_conn_ref(), user.id, other_user_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), messages)))
}

/// PUT mark every message received from another user as read
#[utoipa::path(
    put,
    path = "/messages/conversations/{user_id}/read",
    params(
        ("user_id" = String, Path, description = "The sender whose messages were read")
    ),
    responses(
        (status = 200, description = "Number of messages marked as read", body = u64),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_read(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(other_user_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Mark conversation with {other_user_id} read for {}", user.id);

    let updated =
        MessageApi::mark_conversation_read(app_state.db_conn_ref(), user.id, other_user_id)
            .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), updated)))
}
