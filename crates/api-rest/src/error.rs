//! Mapping core failures onto HTTP responses.

use api_shared::{InternalErrorRes, MessageRes, ValidationErrorRes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use medassist_core::ClinicError;
use medassist_types::ValidationErrors;
use tokio::task::JoinError;

/// Error returned by every handler.
///
/// | error                      | status | body                |
/// |----------------------------|--------|---------------------|
/// | `NotFound`                 | 404    | `{message}`         |
/// | `InvalidTransition`        | 400    | `{message}`         |
/// | `Validation`               | 422    | `{message, errors}` |
/// | `Unauthenticated`          | 401    | `{message}`         |
/// | `Forbidden`                | 403    | `{message}`         |
/// | malformed path parameter   | 400    | `{message}`         |
/// | anything else              | 500    | `{message, error}`  |
#[derive(Debug)]
pub enum ApiError {
    Clinic(ClinicError),
    /// A path segment did not parse, e.g. `/encounters/abc`.
    BadPath(String),
    /// The blocking task running a store call panicked or was cancelled.
    Task(String),
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        Self::Clinic(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Clinic(ClinicError::Validation(errors))
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

fn message(status: StatusCode, message: String) -> Response {
    (status, Json(MessageRes { message })).into_response()
}

fn internal(error: String) -> Response {
    tracing::error!(%error, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(InternalErrorRes {
            message: "Something went wrong".into(),
            error,
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Clinic(err) => err,
            Self::BadPath(m) => return message(StatusCode::BAD_REQUEST, m),
            Self::Task(e) => return internal(e),
        };
        match err {
            err @ ClinicError::NotFound { .. } => message(StatusCode::NOT_FOUND, err.to_string()),
            ClinicError::InvalidTransition(m) => message(StatusCode::BAD_REQUEST, m),
            ClinicError::Unauthenticated(m) => message(StatusCode::UNAUTHORIZED, m),
            ClinicError::Forbidden(m) => message(StatusCode::FORBIDDEN, m),
            ClinicError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorRes {
                    message: "Validation failed".into(),
                    errors,
                }),
            )
                .into_response(),
            other => internal(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ClinicError::not_found("Encounter", 1), StatusCode::NOT_FOUND),
            (
                ClinicError::invalid_transition("nope"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ClinicError::Validation(ValidationErrors::single("summary", "required")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ClinicError::Unauthenticated("who".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ClinicError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ClinicError::StorePoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        assert_eq!(
            ApiError::BadPath("bad id".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Task("panicked".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
