use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::Error;
use domain::{notification as NotificationApi, Id};
use log::*;
use service::AppState;

/// GET all notifications of the authenticated user, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Successfully retrieved notifications", body = [domain::notifications::Model]),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn index(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let notifications = NotificationApi::find_by_user(app_state.db_conn_ref(), user.id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), notifications)))
}

/// GET the number of unread notifications of the authenticated user
#[utoipa::path(
    get,
    path = "/notifications/unread_count",
    responses(
        (status = 200, description = "Successfully counted unread notifications", body = u64),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn unread_count(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let count = NotificationApi::unread_count(app_state.db_conn_ref(), user.id).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({ "unread_count": count }),
    )))
}

/// PUT mark one notification as read
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    params(
        ("id" = String, Path, description = "Notification to mark as read")
    ),
    responses(
        (status = 200, description = "Successfully marked the notification as read", body = domain::notifications::Model),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_read(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Mark notification {id} read for {}", user.id);

    let notification = NotificationApi::mark_read(app_state.db_conn_ref(), user.id, id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), notification)))
}

/// PUT mark every notification of the authenticated user as read
#[utoipa::path(
    put,
    path = "/notifications/read",
    responses(
        (status = 200, description = "Number of notifications marked as read", body = u64),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn mark_all_read(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let updated = NotificationApi::mark_all_read(app_state.db_conn_ref(), user.id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), updated)))
}
