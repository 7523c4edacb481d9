use crate::Error;
use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use domain::identity::{self, TokenVerifier};
use domain::users;
use log::*;
use serde::Deserialize;
use service::AppState;
use std::sync::Arc;

pub(crate) struct AuthenticatedUser(pub users::Model);

#[derive(Debug, Deserialize)]
struct TokenParams {
    token: Option<String>,
}

/// Finds the bearer credential of a request. The `Authorization` header wins;
/// the `token` query parameter exists for `EventSource` clients, which cannot
/// set headers.
fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned);

    from_header.or_else(|| {
        Query::<TokenParams>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(params)| params.token)
            .filter(|token| !token.is_empty())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Error;

    // Resolves the bearer token to a user, provisioning the user on first sign-in.
    async fn from_request_parts(
        parts: &mut Parts,
        app_state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            debug!("No bearer token on request to {}", parts.uri.path());
            Error::unauthenticated()
        })?;

        let verifier = parts
            .extensions
            .get::<Arc<TokenVerifier>>()
            .cloned()
            .ok_or_else(|| {
                error!("No token verifier installed on the router");
                Error::config()
            })?;

        let user = identity::authenticate(app_state.db_conn_ref(), &verifier, &token).await?;
        trace!("Authenticated user {}", user.id);

        Ok(AuthenticatedUser(user))
    }
}
