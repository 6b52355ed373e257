//! # API REST
//!
//! REST API for MedAssist.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS, request tracing)
//!
//! Business rules live in `medassist-core`; DTOs and authentication helpers in `api-shared`.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;

use axum::routing::{get, put};
use axum::Router;
use medassist_core::{
    ClinicalRecordService, EncounterService, PatientService, SqliteStore, UserService,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use handlers::{clinical_records, encounters, health, patients, users};

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub encounters: EncounterService<SqliteStore>,
    pub records: ClinicalRecordService<SqliteStore>,
    pub patients: PatientService<SqliteStore>,
    pub users: UserService<SqliteStore>,
}

impl AppState {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            encounters: EncounterService::new(Arc::clone(&store)),
            records: ClinicalRecordService::new(Arc::clone(&store)),
            patients: PatientService::new(Arc::clone(&store)),
            users: UserService::new(store),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        encounters::list_encounters,
        encounters::create_encounter,
        encounters::get_encounter,
        encounters::start_consultation,
        encounters::end_consultation,
        encounters::cancel_consultation,
        clinical_records::list_observations,
        clinical_records::create_observation,
        clinical_records::list_diagnoses,
        clinical_records::create_diagnosis,
        clinical_records::list_treatments,
        clinical_records::create_treatment,
        patients::list_patients,
        patients::create_patient,
        patients::get_patient,
        patients::update_patient,
        patients::delete_patient,
        users::list_users,
        users::create_user,
        users::get_user,
        users::toggle_account_status,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::MessageRes,
        api_shared::ValidationErrorRes,
        api_shared::InternalErrorRes,
        api_shared::CreateEncounterReq,
        api_shared::EndConsultationReq,
        api_shared::EncounterRes,
        api_shared::EncounterMessageRes,
        api_shared::EncounterShowRes,
        api_shared::ListEncountersRes,
        api_shared::CreateObservationReq,
        api_shared::ObservationRes,
        api_shared::ObservationMessageRes,
        api_shared::ListObservationsRes,
        api_shared::CreateDiagnosisReq,
        api_shared::DiagnosisRes,
        api_shared::DiagnosisMessageRes,
        api_shared::ListDiagnosesRes,
        api_shared::CreateTreatmentReq,
        api_shared::TreatmentRes,
        api_shared::TreatmentMessageRes,
        api_shared::ListTreatmentsRes,
        api_shared::PatientReq,
        api_shared::PatientRes,
        api_shared::PatientMessageRes,
        api_shared::PatientShowRes,
        api_shared::ListPatientsRes,
        api_shared::CreateUserReq,
        api_shared::UserRes,
        api_shared::UserMessageRes,
        api_shared::UserShowRes,
        api_shared::ListUsersRes,
        medassist_types::ValidationErrors,
        medassist_types::EncounterStatus,
        medassist_types::ObservationType,
        medassist_types::TreatmentType,
        medassist_types::Gender,
        medassist_types::Role,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST application, Swagger UI included.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/encounters",
            get(encounters::list_encounters).post(encounters::create_encounter),
        )
        .route("/encounters/:id", get(encounters::get_encounter))
        .route(
            "/encounters/:id/start-consultation",
            put(encounters::start_consultation),
        )
        .route(
            "/encounters/:id/end-consultation",
            put(encounters::end_consultation),
        )
        .route(
            "/encounters/:id/cancel-consultation",
            put(encounters::cancel_consultation),
        )
        .route(
            "/encounters/:id/observations",
            get(clinical_records::list_observations).post(clinical_records::create_observation),
        )
        .route(
            "/encounters/:id/diagnoses",
            get(clinical_records::list_diagnoses).post(clinical_records::create_diagnosis),
        )
        .route(
            "/encounters/:id/treatments",
            get(clinical_records::list_treatments).post(clinical_records::create_treatment),
        )
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:id",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route(
            "/users/:id/account-status",
            put(users::toggle_account_status),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
