use crate::error::ApiResult;
use crate::extract::{ApiPath, CurrentActor, JsonBody};
use crate::handlers::blocking;
use crate::AppState;
use api_shared::{
    CreateEncounterReq, EncounterMessageRes, EncounterQuery, EncounterShowRes,
    EndConsultationReq, ListEncountersRes, MessageRes, ValidationErrorRes,
};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use medassist_core::models::{Encounter, EncounterFilter};
use medassist_types::{EncounterStatus, ValidationErrors};

fn envelope(message: &str, encounter: Encounter) -> Json<EncounterMessageRes> {
    Json(EncounterMessageRes {
        message: message.into(),
        encounter: encounter.into(),
    })
}

#[utoipa::path(
    get,
    path = "/encounters",
    params(EncounterQuery, ("x-user-id" = i64, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Encounters, most recently started first", body = ListEncountersRes),
        (status = 401, description = "Unauthenticated", body = MessageRes),
        (status = 422, description = "Unknown status filter", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn list_encounters(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<EncounterQuery>,
) -> ApiResult<Json<ListEncountersRes>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<EncounterStatus>().map_err(|_| {
            ValidationErrors::single("status", "The selected status is invalid.")
        })?),
    };
    let filter = EncounterFilter {
        patient_id: query.patient_id,
        status,
    };
    let encounters = blocking(move || state.encounters.list(&actor, &filter)).await?;
    Ok(Json(ListEncountersRes {
        encounters: encounters.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/encounters",
    request_body = CreateEncounterReq,
    params(("x-user-id" = i64, Header, description = "Authenticated user id")),
    responses(
        (status = 201, description = "Encounter created", body = EncounterMessageRes),
        (status = 401, description = "Unauthenticated", body = MessageRes),
        (status = 403, description = "Role not allowed", body = MessageRes),
        (status = 422, description = "Validation failed", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn create_encounter(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(req): JsonBody<CreateEncounterReq>,
) -> ApiResult<(StatusCode, Json<EncounterMessageRes>)> {
    let encounter = blocking(move || state.encounters.create(&actor, req.patient_id)).await?;
    Ok((
        StatusCode::CREATED,
        envelope("Encounter created successfully", encounter),
    ))
}

#[utoipa::path(
    get,
    path = "/encounters/{id}",
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Encounter with child record counts", body = EncounterShowRes),
        (status = 404, description = "Encounter not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn get_encounter(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<EncounterShowRes>> {
    let detail = blocking(move || state.encounters.get(&actor, id)).await?;
    Ok(Json(EncounterShowRes {
        encounter: detail.into(),
    }))
}

#[utoipa::path(
    put,
    path = "/encounters/{id}/start-consultation",
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Consultation started", body = EncounterMessageRes),
        (status = 400, description = "Consultation already started", body = MessageRes),
        (status = 404, description = "Encounter not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn start_consultation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<EncounterMessageRes>> {
    let encounter = blocking(move || state.encounters.start(&actor, id)).await?;
    Ok(envelope("Consultation started successfully", encounter))
}

#[utoipa::path(
    put,
    path = "/encounters/{id}/end-consultation",
    request_body = EndConsultationReq,
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Consultation ended", body = EncounterMessageRes),
        (status = 400, description = "Consultation not in progress", body = MessageRes),
        (status = 404, description = "Encounter not found", body = MessageRes),
        (status = 422, description = "Summary missing", body = ValidationErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn end_consultation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
    body: Option<JsonBody<EndConsultationReq>>,
) -> ApiResult<Json<EncounterMessageRes>> {
    let summary = body.and_then(|JsonBody(req)| req.summary);
    let encounter = blocking(move || state.encounters.end(&actor, id, summary.as_deref())).await?;
    Ok(envelope("Consultation ended successfully", encounter))
}

#[utoipa::path(
    put,
    path = "/encounters/{id}/cancel-consultation",
    params(
        ("id" = i64, Path, description = "Encounter id"),
        ("x-user-id" = i64, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 200, description = "Consultation canceled", body = EncounterMessageRes),
        (status = 400, description = "Consultation not in progress", body = MessageRes),
        (status = 404, description = "Encounter not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn cancel_consultation(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<EncounterMessageRes>> {
    let encounter = blocking(move || state.encounters.cancel(&actor, id)).await?;
    Ok(envelope("Consultation canceled successfully", encounter))
}
