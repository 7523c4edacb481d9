use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::protect::{authorize, Predicate, UserInGroup};
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::IntoResponse,
};
use domain::Id;
use service::AppState;

/// Checks that the authenticated user is a member of the group named by the
/// `group_id` path segment.
/// Intended to be given to axum::middleware::from_fn_with_state in the router
pub(crate) async fn member(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(group_id): Path<Id>,
    request: Request,
    next: Next,
) -> impl IntoResponse {
    let checks = vec![Predicate::new(UserInGroup, vec![group_id])];
    authorize(&app_state, user, request, next, checks).await
}
