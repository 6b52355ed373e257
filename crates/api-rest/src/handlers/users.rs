use crate::error::ApiResult;
use crate::extract::{ApiPath, CurrentActor, JsonBody};
use crate::handlers::blocking;
use crate::AppState;
use api_shared::{
    CreateUserReq, ListUsersRes, MessageRes, SearchQuery, UserMessageRes, UserShowRes,
    ValidationErrorRes,
};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;

#[utoipa::path(
    get,
    path = "/users",
    params(SearchQuery, ("x-user-id" = i64, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "List of users", body = ListUsersRes),
        (status = 403, description = "Administrators only", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ListUsersRes>> {
    let users = blocking(move || state.users.list(&actor, query.search.as_deref())).await?;
    Ok(Json(ListUsersRes {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserReq,
    params(("x-user-id" = i64, Header, description = "Authenticated user id")),
    responses(
        (status = 201, description = "User created", body = UserMessageRes),
        (status = 403, description = "Administrators only", body = MessageRes),
        (status = 422, description = "Validation failed", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(req): JsonBody<CreateUserReq>,
) -> ApiResult<(StatusCode, Json<UserMessageRes>)> {
    let user = blocking(move || state.users.create(&actor, &req.into())).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserMessageRes {
            message: "User created successfully".into(),
            user: user.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = i64, Path, description = "User id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "User", body = UserShowRes),
        (status = 403, description = "Administrators only", body = MessageRes),
        (status = 404, description = "User not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserShowRes>> {
    let user = blocking(move || state.users.get(&actor, id)).await?;
    Ok(Json(UserShowRes { user: user.into() }))
}

#[utoipa::path(
    put,
    path = "/users/{id}/account-status",
    params(
        ("id" = i64, Path, description = "User id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Account opened or closed", body = UserMessageRes),
        (status = 403, description = "Administrators only", body = MessageRes),
        (status = 404, description = "User not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn toggle_account_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserMessageRes>> {
    let user = blocking(move || state.users.toggle_account_status(&actor, id)).await?;
    Ok(Json(UserMessageRes {
        message: "User account status updated successfully".into(),
        user: user.into(),
    }))
}
