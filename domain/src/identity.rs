//! Resolves bearer tokens issued by the identity provider to platform users.
//!
//! Tokens are HS256 JWTs. The `sub` claim identifies the user at the provider
//! and maps to `users.external_id`; a subject seen for the first time is
//! provisioned as a new user from the profile claims.

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::users::Model;
use entity::Id;
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use entity_api::user;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::*;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use service::config::Config;
use std::future::Future;

const USERNAME_RETRIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Claims {
    fn username(&self) -> String {
        self.preferred_username
            .clone()
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| format!("user_{}", &Id::new_v4().simple().to_string()[..12]))
    }
}

/// Verifies bearer tokens. Built once at startup and shared by every request.
pub struct TokenVerifier {
    // None when no secret is configured; every token is then refused.
    key: Option<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        Self {
            key: Some(DecodingKey::from_secret(secret.as_bytes())),
            validation: Self::validation(issuer, audience),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let issuer = config.identity_issuer();
        let audience = config.identity_audience();
        let validation = Self::validation(issuer.as_deref(), audience.as_deref());

        match config.identity_jwt_secret() {
            Some(secret) => Self {
                key: Some(DecodingKey::from_secret(secret.as_bytes())),
                validation,
            },
            None => {
                error!("IDENTITY_JWT_SECRET is not set, bearer tokens cannot be verified");
                Self {
                    key: None,
                    validation,
                }
            }
        }
    }

    fn validation(issuer: Option<&str>, audience: Option<&str>) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }

    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let key = self.key.as_ref().ok_or(Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        })?;

        Ok(decode::<Claims>(token, key, &self.validation)?.claims)
    }
}

/// Verifies `token` and returns the user it belongs to, creating the user on
/// first sign-in.
pub async fn authenticate(
    db: &DatabaseConnection,
    verifier: &TokenVerifier,
    token: &str,
) -> Result<Model, Error> {
    let claims = verifier.verify(token)?;
    find_or_create(db, claims).await
}

pub async fn find_or_create(db: &DatabaseConnection, claims: Claims) -> Result<Model, Error> {
    if let Some(user) = user::find_by_external_id(db, &claims.sub).await? {
        return Ok(user);
    }

    info!("Provisioning user for new identity subject {}", claims.sub);
    provision(db, &claims, |new_user| user::create(db, new_user)).await
}

/// Inserts the user for `claims` through `insert`. A rejected insert is a lost
/// race when the subject now exists; otherwise the username is taken and the
/// insert is retried with a suffixed one.
async fn provision<F, Fut>(
    db: &DatabaseConnection,
    claims: &Claims,
    mut insert: F,
) -> Result<Model, Error>
where
    F: FnMut(Model) -> Fut,
    Fut: Future<Output = Result<Model, EntityApiError>>,
{
    let base = claims.username();
    let mut username = base.clone();
    let mut retries = 0;

    loop {
        let now = chrono::Utc::now();
        let new_user = Model {
            id: Id::nil(),
            external_id: claims.sub.clone(),
            username: username.clone(),
            display_name: claims.name.clone(),
            email: claims.email.clone(),
            avatar_url: None,
            created_at: now.into(),
            updated_at: now.into(),
        };

        match insert(new_user).await {
            Ok(user) => return Ok(user),
            Err(e) if e.error_kind == EntityApiErrorKind::ValidationError => {
                if let Some(user) = user::find_by_external_id(db, &claims.sub).await? {
                    return Ok(user);
                }
                if retries == USERNAME_RETRIES {
                    warn!("Could not provision user for subject {}: {e}", claims.sub);
                    return Err(Error {
                        source: Some(Box::new(e)),
                        error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                            EntityErrorKind::Invalid,
                        )),
                    });
                }
                retries += 1;
                username = format!("{base}_{}", &Id::new_v4().simple().to_string()[..8]);
                info!(
                    "Username taken for subject {}, retrying as {username}",
                    claims.sub
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}


#[cfg(test)]
#[cfg(feature = "mock")]
mod mock_tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn claims() -> Claims {
        Claims {
            sub: "idp|7".to_owned(),
            exp: 0,
            email: None,
            preferred_username: Some("lin".to_owned()),
            name: None,
        }
    }

    fn user_model() -> Model {
        Model {
            id: Id::new_v4(),
            external_id: "idp|7".to_owned(),
            username: "lin".to_owned(),
            display_name: None,
            email: None,
            avatar_url: None,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn known_subjects_resolve_to_their_user() -> Result<(), Error> {
        let existing = user_model();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![existing.clone()]])
            .into_connection();

        assert_eq!(find_or_create(&db, claims()).await?, existing);
        Ok(())
    }

    #[tokio::test]
    async fn new_subjects_are_provisioned() -> Result<(), Error> {
        let created = user_model();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new(), vec![created.clone()]])
            .into_connection();

        let user = find_or_create(&db, claims()).await?;

        assert_eq!(user.username, "lin");
        assert_eq!(user.external_id, "idp|7");
        Ok(())
    }

    fn username_taken() -> EntityApiError {
        EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::ValidationError,
        }
    }

    #[tokio::test]
    async fn taken_usernames_are_retried_with_a_suffix() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();
        let mut attempted = Vec::new();

        let user = provision(&db, &claims(), |new_user: Model| {
            attempted.push(new_user.username.clone());
            let result = if attempted.len() == 1 {
                Err(username_taken())
            } else {
                Ok(new_user)
            };
            async move { result }
        })
        .await?;

        assert_eq!(attempted.len(), 2);
        assert_eq!(attempted[0], "lin");
        assert!(user.username.starts_with("lin_"), "{}", user.username);
        assert_eq!(user.username.len(), "lin_".len() + 8);
        assert_eq!(user.external_id, "idp|7");
        Ok(())
    }

    #[tokio::test]
    async fn a_concurrent_insert_for_the_same_subject_is_reused() -> Result<(), Error> {
        let existing = user_model();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![existing.clone()]])
            .into_connection();
        let mut inserts = 0;

        let user = provision(&db, &claims(), |_: Model| {
            inserts += 1;
            async { Err(username_taken()) }
        })
        .await?;

        assert_eq!(inserts, 1);
        assert_eq!(user, existing);
        Ok(())
    }

    #[tokio::test]
    async fn provisioning_gives_up_after_repeated_collisions() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new(); USERNAME_RETRIES + 1])
            .into_connection();

        let err = provision(&db, &claims(), |_: Model| async { Err(username_taken()) })
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid))
        );
    }
}
