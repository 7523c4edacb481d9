use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl Error {
    pub(crate) fn unauthenticated() -> Self {
        Self(DomainError {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::Unauthenticated,
            )),
        })
    }

    pub(crate) fn config() -> Self {
        Self(DomainError {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        })
    }

    fn status_code(&self) -> StatusCode {
        match &self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => StatusCode::NOT_FOUND,
                    EntityErrorKind::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
                    EntityErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                    EntityErrorKind::Forbidden => StatusCode::FORBIDDEN,
                    EntityErrorKind::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network => StatusCode::BAD_GATEWAY,
                ExternalErrorKind::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request rejected with {status_code}: {self}");
        }

        let reason = status_code
            .canonical_reason()
            .unwrap_or("UNKNOWN")
            .to_uppercase();
        (status_code, reason).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_error(kind: EntityErrorKind) -> Error {
        Error(DomainError {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(kind)),
        })
    }

    #[test]
    fn entity_errors_map_to_client_errors() {
        assert_eq!(
            entity_error(EntityErrorKind::NotFound).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            entity_error(EntityErrorKind::Invalid).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::unauthenticated().into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            entity_error(EntityErrorKind::Forbidden).into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn configuration_and_network_errors_map_to_server_errors() {
        let config = Error::config();
        let network = Error(DomainError {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
        });

        assert_eq!(
            config.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(network.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
