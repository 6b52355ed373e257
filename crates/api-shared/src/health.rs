use serde::Serialize;
use utoipa::ToSchema;

/// Liveness report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Health check behind the REST `/health` route.
#[derive(Clone, Debug)]
pub struct HealthService;

impl HealthService {
    /// Returns a liveness report. Needs no store access.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "MedAssist is alive".into(),
        }
    }
}
