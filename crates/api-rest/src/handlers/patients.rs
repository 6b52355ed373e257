use crate::error::ApiResult;
use crate::extract::{ApiPath, CurrentActor, JsonBody};
use crate::handlers::blocking;
use crate::AppState;
use api_shared::{
    ListPatientsRes, MessageRes, PatientMessageRes, PatientReq, PatientShowRes, SearchQuery,
    ValidationErrorRes,
};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;

#[utoipa::path(
    get,
    path = "/patients",
    params(SearchQuery, ("x-user-id" = i64, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "List of patients", body = ListPatientsRes),
        (status = 401, description = "Unauthenticated", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ListPatientsRes>> {
    let patients = blocking(move || state.patients.list(&actor, query.search.as_deref())).await?;
    Ok(Json(ListPatientsRes {
        patients: patients.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientReq,
    params(("x-user-id" = i64, Header, description = "Authenticated user id")),
    responses(
        (status = 201, description = "Patient created", body = PatientMessageRes),
        (status = 403, description = "Role not allowed", body = MessageRes),
        (status = 422, description = "Validation failed", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(req): JsonBody<PatientReq>,
) -> ApiResult<(StatusCode, Json<PatientMessageRes>)> {
    let patient = blocking(move || state.patients.create(&actor, &req.into())).await?;
    Ok((
        StatusCode::CREATED,
        Json(PatientMessageRes {
            message: "Patient created successfully".into(),
            patient: patient.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(
        ("id" = i64, Path, description = "Patient id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Patient", body = PatientShowRes),
        (status = 404, description = "Patient not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PatientShowRes>> {
    let patient = blocking(move || state.patients.get(&actor, id)).await?;
    Ok(Json(PatientShowRes {
        patient: patient.into(),
    }))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    request_body = PatientReq,
    params(
        ("id" = i64, Path, description = "Patient id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Patient updated", body = PatientMessageRes),
        (status = 404, description = "Patient not found", body = MessageRes),
        (status = 422, description = "Validation failed", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<PatientReq>,
) -> ApiResult<Json<PatientMessageRes>> {
    let patient = blocking(move || state.patients.update(&actor, id, &req.into())).await?;
    Ok(Json(PatientMessageRes {
        message: "Patient updated successfully".into(),
        patient: patient.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(
        ("id" = i64, Path, description = "Patient id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Patient and their records deleted", body = MessageRes),
        (status = 403, description = "Administrators only", body = MessageRes),
        (status = 404, description = "Patient not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageRes>> {
    blocking(move || state.patients.delete(&actor, id)).await?;
    Ok(Json(MessageRes {
        message: "Patient deleted successfully".into(),
    }))
}
