//! Authorization checks applied as route middleware.
//!
//! Each submodule protects one kind of resource, so that handlers behind it
//! only run for users allowed to reach that resource.

pub(crate) mod groups;

use async_trait::async_trait;
use axum::{extract::Request, http::StatusCode, middleware::Next, response::IntoResponse};
use domain::{group as GroupApi, Id};
use log::*;
use service::AppState;

/// Trait representing a single authorization rule.
///
/// Implementors answer **“is the authenticated user allowed to proceed?”**.
/// The rule receives the shared application state, the authenticated user and
/// any additional [`Id`] parameters supplied by the caller.
#[async_trait]
pub trait Check: Send + Sync {
    async fn eval(&self, app: &AppState, user: &domain::users::Model, args: Vec<Id>) -> bool;
}

/// Pairs a [`Check`] implementation with the concrete arguments that the rule
/// should receive when evaluated.
pub(crate) struct Predicate {
    predicate: Box<dyn Check>,
    args: Vec<Id>,
}

impl Predicate {
    pub(crate) fn new<C: Check + 'static>(predicate: C, args: Vec<Id>) -> Self {
        Self {
            predicate: Box::new(predicate),
            args,
        }
    }

    pub(crate) async fn check(&self, app_state: &AppState, user: &domain::users::Model) -> bool {
        self.predicate
            .eval(app_state, user, self.args.clone())
            .await
    }
}

/// Axum middleware body that enforces one or more [`Predicate`]s in order.
/// The first rule returning `false` aborts the request with **403 FORBIDDEN**.
pub(crate) async fn authorize(
    app_state: &AppState,
    authenticated_user: domain::users::Model,
    request: Request,
    next: Next,
    checks: Vec<Predicate>,
) -> impl IntoResponse {
    for check in checks {
        if !check.check(app_state, &authenticated_user).await {
            return (StatusCode::FORBIDDEN, "FORBIDDEN").into_response();
        }
    }
    next.run(request).await
}

pub struct UserInGroup;

#[async_trait]
impl Check for UserInGroup {
    async fn eval(
        &self,
        app_state: &AppState,
        authenticated_user: &domain::users::Model,
        args: Vec<Id>,
    ) -> bool {
        let Some(group_id) = args.first().copied() else {
            return false;
        };
        match GroupApi::is_member(app_state.db_conn_ref(), group_id, authenticated_user.id).await {
            Ok(is_member) => is_member,
            Err(e) => {
                error!("Failed to look up membership of group {group_id}: {e}");
                false
            }
        }
    }
}
