use crate::controller::{
    group_message_controller, health_check_controller, message_controller,
    notification_controller,
};
use crate::{params, protect, sse};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Extension, Router,
};
use domain::identity::TokenVerifier;
use service::AppState;
use std::sync::Arc;

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Pulse Platform API"
        ),
        paths(
            group_message_controller::create,
            group_message_controller::index,
            health_check_controller::health_check,
            message_controller::create,
            message_controller::index,
            message_controller::mark_read,
            notification_controller::index,
            notification_controller::unread_count,
            notification_controller::mark_read,
            notification_controller::mark_all_read,
            sse::handler::message_stream,
            sse::handler::notification_stream,
        ),
        components(
            schemas(
                domain::group_messages::Model,
                domain::messages::Model,
                domain::notifications::Model,
                domain::notification_kind::NotificationKind,
                domain::users::Model,
                params::message::SendMessageParams,
                params::group_message::SendGroupMessageParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "pulse_platform", description = "Pulse community messaging and notifications API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Every endpoint except /health expects an identity provider JWT as a bearer token.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Identity provider access token. Stream endpoints also accept it as the `token` query parameter",
                        ))
                        .build(),
                ),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let verifier = Arc::new(TokenVerifier::from_config(&app_state.config));

    Router::new()
        .merge(health_routes())
        .merge(message_routes(app_state.clone()))
        .merge(group_message_routes(app_state.clone()))
        .merge(notification_routes(app_state.clone()))
        .merge(stream_routes(app_state))
        // FIXME: protect the OpenAPI web UI
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(Extension(verifier))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn message_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/messages", post(message_controller::create))
        .route(
            "/messages/conversations/:user_id",
            get(message_controller::index),
        )
        .route(
            "/messages/conversations/:user_id/read",
            put(message_controller::mark_read),
        )
        .with_state(app_state)
}

fn group_message_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/groups/:group_id/messages",
            get(group_message_controller::index).post(group_message_controller::create),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            protect::groups::member,
        ))
        .with_state(app_state)
}

fn notification_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/notifications", get(notification_controller::index))
        .route(
            "/notifications/unread_count",
            get(notification_controller::unread_count),
        )
        .route(
            "/notifications/read",
            put(notification_controller::mark_all_read),
        )
        .route(
            "/notifications/:id/read",
            put(notification_controller::mark_read),
        )
        .with_state(app_state)
}

fn stream_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/messages/stream", get(sse::handler::message_stream))
        .route(
            "/notifications/stream",
            get(sse::handler::notification_stream),
        )
        .with_state(app_state)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use clap::Parser;
    use domain::{users, Id};
    use domain::events::EventDispatcher;
    use futures::StreamExt;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret";

    fn user_model() -> users::Model {
        users::Model {
            id: Id::new_v4(),
            external_id: "idp|router".to_owned(),
            username: "router".to_owned(),
            display_name: None,
            email: None,
            avatar_url: None,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        }
    }

    fn token() -> String {
        let claims = domain::identity::Claims {
            sub: "idp|router".to_owned(),
            exp: (chrono::Utc::now().timestamp() + 3600) as u64,
            email: None,
            preferred_username: None,
            name: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn app_state(db: MockDatabase) -> AppState {
        let config = Config::try_parse_from(["pulse_platform_rs"])
            .unwrap()
            .set_identity_jwt_secret(SECRET.to_string());
        let (dispatcher, _receiver) = EventDispatcher::channel(8);
        AppState::new(
            config,
            &Arc::new(db.into_connection()),
            Arc::new(::sse::Broadcaster::new()),
            dispatcher,
        )
    }

    #[tokio::test]
    async fn health_check_needs_no_token() {
        let router = define_routes(app_state(MockDatabase::new(DatabaseBackend::Postgres)));

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn endpoints_without_a_token_are_unauthorized() {
        let router = define_routes(app_state(MockDatabase::new(DatabaseBackend::Postgres)));

        for uri in ["/notifications", "/messages/stream", "/notifications/stream"] {
            let response = router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn forged_tokens_are_unauthorized() {
        let router = define_routes(app_state(MockDatabase::new(DatabaseBackend::Postgres)));

        let response = router
            .oneshot(
                Request::get("/notifications")
                    .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tokens_cannot_be_verified_without_a_configured_secret() {
        let config = Config::try_parse_from(["pulse_platform_rs"]).unwrap();
        let (dispatcher, _receiver) = EventDispatcher::channel(8);
        let state = AppState::new(
            config,
            &Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection()),
            Arc::new(::sse::Broadcaster::new()),
            dispatcher,
        );
        let router = define_routes(state);

        let response = router
            .oneshot(
                Request::get("/notifications")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unread_count_is_wrapped_in_an_api_response() {
        let user = user_model();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![user.clone()]])
            .append_query_results(vec![vec![std::collections::BTreeMap::from([(
                "num_items",
                sea_orm::Value::BigInt(Some(3)),
            )])]]);
        let router = define_routes(app_state(db));

        let response = router
            .oneshot(
                Request::get("/notifications/unread_count")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status_code": 200, "data": {"unread_count": 3}})
        );
    }

    #[tokio::test]
    async fn message_stream_accepts_the_query_token_and_opens_with_connected() {
        let user = user_model();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![user.clone()]]);
        let state = app_state(db);
        let broadcaster = state.broadcaster.clone();
        let router = define_routes(state);

        let response = router
            .oneshot(
                Request::get(format!("/messages/stream?token={}", token()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()["x-accel-buffering"], "no");

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let first = String::from_utf8(first.to_vec()).unwrap();
        assert!(first.starts_with("event: connected\n"), "{first}");
        assert!(first.contains(&user.id.to_string()));
        assert_eq!(broadcaster.connection_count(Some(&user.id.to_string())), 1);

        drop(body);
        assert_eq!(broadcaster.connection_count(None), 0);
    }
}
