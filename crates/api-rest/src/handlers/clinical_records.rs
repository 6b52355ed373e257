use crate::error::ApiResult;
use crate::extract::{ApiPath, CurrentActor, JsonBody};
use crate::handlers::blocking;
use crate::AppState;
use api_shared::{
    CreateDiagnosisReq, CreateObservationReq, CreateTreatmentReq, DiagnosisMessageRes,
    ListDiagnosesRes, ListObservationsRes, ListTreatmentsRes, MessageRes, ObservationMessageRes,
    TreatmentMessageRes, ValidationErrorRes,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use medassist_core::validation::ObservationInput;

#[utoipa::path(
    get,
    path = "/encounters/{id}/observations",
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Observations, newest first", body = ListObservationsRes),
        (status = 404, description = "Encounter not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn list_observations(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ListObservationsRes>> {
    let observations = blocking(move || state.records.list_observations(&actor, id)).await?;
    Ok(Json(ListObservationsRes {
        observations: observations.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/encounters/{id}/observations",
    request_body = CreateObservationReq,
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 201, description = "Observation created", body = ObservationMessageRes),
        (status = 400, description = "Consultation not in progress", body = MessageRes),
        (status = 404, description = "Encounter not found", body = MessageRes),
        (status = 422, description = "Validation failed", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_observation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<CreateObservationReq>,
) -> ApiResult<(StatusCode, Json<ObservationMessageRes>)> {
    let input = ObservationInput::try_from(req)?;
    let observation = blocking(move || state.records.create_observation(&actor, id, &input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ObservationMessageRes {
            message: "Observation created successfully".into(),
            observation: observation.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/encounters/{id}/diagnoses",
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Diagnoses, primary first", body = ListDiagnosesRes),
        (status = 404, description = "Encounter not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn list_diagnoses(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ListDiagnosesRes>> {
    let diagnoses = blocking(move || state.records.list_diagnoses(&actor, id)).await?;
    Ok(Json(ListDiagnosesRes {
        diagnoses: diagnoses.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/encounters/{id}/diagnoses",
    request_body = CreateDiagnosisReq,
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 201, description = "Diagnosis created", body = DiagnosisMessageRes),
        (status = 400, description = "Consultation not in progress", body = MessageRes),
        (status = 403, description = "Role not allowed", body = MessageRes),
        (status = 404, description = "Encounter not found", body = MessageRes),
        (status = 422, description = "Validation failed", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_diagnosis(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<CreateDiagnosisReq>,
) -> ApiResult<(StatusCode, Json<DiagnosisMessageRes>)> {
    let diagnosis =
        blocking(move || state.records.create_diagnosis(&actor, id, &req.into())).await?;
    Ok((
        StatusCode::CREATED,
        Json(DiagnosisMessageRes {
            message: "Diagnosis created successfully".into(),
            diagnosis: diagnosis.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/encounters/{id}/treatments",
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Treatments, newest first", body = ListTreatmentsRes),
        (status = 404, description = "Encounter not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn list_treatments(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ListTreatmentsRes>> {
    let treatments = blocking(move || state.records.list_treatments(&actor, id)).await?;
    Ok(Json(ListTreatmentsRes {
        treatments: treatments.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/encounters/{id}/treatments",
    request_body = CreateTreatmentReq,
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 201, description = "Treatment created", body = TreatmentMessageRes),
        (status = 400, description = "Treatment gating failed", body = MessageRes),
        (status = 403, description = "Role not allowed", body = MessageRes),
        (status = 404, description = "Encounter not found", body = MessageRes),
        (status = 422, description = "Validation failed", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_treatment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<CreateTreatmentReq>,
) -> ApiResult<(StatusCode, Json<TreatmentMessageRes>)> {
    let treatment =
        blocking(move || state.records.create_treatment(&actor, id, &req.into())).await?;
    Ok((
        StatusCode::CREATED,
        Json(TreatmentMessageRes {
            message: "Treatment created successfully".into(),
            treatment: treatment.into(),
        }),
    ))
}
