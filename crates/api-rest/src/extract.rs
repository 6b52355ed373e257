//! Request extractors.

use crate::error::ApiError;
use crate::handlers::blocking;
use crate::AppState;
use api_shared::auth::{authenticate, USER_ID_HEADER};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use medassist_core::Actor;
use medassist_types::ValidationErrors;

/// The user a request acts for, resolved from the `x-user-id` header.
#[derive(Clone, Copy, Debug)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let users = state.users.clone();
        let actor = blocking(move || authenticate(&users, raw.as_deref())).await?;
        Ok(Self(actor))
    }
}

/// `Json<T>` whose rejections are reported as 422 validation failures on `body`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(%rejection, "rejected request body");
                Err(ValidationErrors::single("body", rejection.body_text()).into())
            }
        }
    }
}

/// `Path<T>` whose rejections come back as a 400 `{message}` body.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(%rejection, "rejected path parameter");
                Err(ApiError::BadPath(rejection.body_text()))
            }
        }
    }
}
