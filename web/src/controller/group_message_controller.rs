use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::group_message::SendGroupMessageParams;
use crate::Error;
use domain::{group_message as GroupMessageApi, Id};
use log::*;
use service::AppState;

/// POST a message to a group conversation
#[utoipa::path(
    post,
    path = "/groups/{group_id}/messages",
    params(
        ("group_id" = String, Path, description = "Group to post to")
    ),
    request_body = SendGroupMessageParams,
    responses(
        (status = 201, description = "Successfully posted a new Group Message", body = domain::group_messages::Model),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a member of the group"),
        (status = 422, description = "Unprocessable Entity"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(group_id): Path<Id>,
    Json(params): Json<SendGroupMessageParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Group Message to {group_id} from {}", user.id);

    let message = GroupMessageApi::send(
        app_state.db_conn_ref(),
        &app_state.event_dispatcher,
        group_id,
        user.id,
        params.content,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(StatusCode::CREATED.into(), message)),
    ))
}

/// GET the messages of a group conversation
#[utoipa::path(
    get,
    path = "/groups/{group_id}/messages",
    params(
        ("group_id" = String, Path, description = "Group to read")
    ),
    responses(
        (status = 200, description = "Successfully retrieved the group's messages, oldest first", body = [domain::group_messages::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a member of the group"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn index(
    State(app_state): State<AppState>,
    Path(group_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Group Messages of {group_id}");

    let messages = GroupMessageApi::find_by_group(app_state.db_conn_ref(), group_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), messages)))
}
