//! JSON bodies exchanged with API clients.
//!
//! Request bodies keep every field optional so that a missing field reaches core validation and
//! comes back as a field-keyed 422 instead of a deserialisation failure. Response bodies mirror
//! the core records and carry the OpenAPI schema.

use chrono::{DateTime, NaiveDate, Utc};
use medassist_core::models::{
    Diagnosis, Encounter, EncounterDetail, Observation, Patient, Treatment, User,
};
use medassist_core::validation::{
    validate_observation, DiagnosisInput, ObservationInput, PatientInput, TreatmentInput,
    UserInput,
};
use medassist_types::{
    EncounterStatus, Gender, ObservationType, Role, TreatmentType, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Reported when an observation reading is neither a JSON string nor a number.
pub const MSG_VALUE_NOT_TEXT: &str = "The value field must be a string.";

// -- generic ----------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

/// Body of a 422 response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationErrorRes {
    pub message: String,
    pub errors: ValidationErrors,
}

/// Body of a 500 response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct InternalErrorRes {
    pub message: String,
    pub error: String,
}

// -- encounters -------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CreateEncounterReq {
    pub patient_id: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct EndConsultationReq {
    pub summary: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EncounterQuery {
    pub patient_id: Option<i64>,
    /// One of `INITIALIZED`, `IN_PROGRESS`, `COMPLETED`, `CANCELED`.
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct EncounterRes {
    pub id: i64,
    pub patient_id: i64,
    pub user_id: i64,
    pub status: EncounterStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnoses_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatments_count: Option<u32>,
}

impl From<Encounter> for EncounterRes {
    fn from(e: Encounter) -> Self {
        Self {
            id: e.id,
            patient_id: e.patient_id,
            user_id: e.user_id,
            status: e.status,
            started_at: e.started_at,
            ended_at: e.ended_at,
            summary: e.summary,
            created_at: e.created_at,
            observations_count: None,
            diagnoses_count: None,
            treatments_count: None,
        }
    }
}

impl From<EncounterDetail> for EncounterRes {
    fn from(detail: EncounterDetail) -> Self {
        let counts = detail.counts;
        Self {
            observations_count: Some(counts.observations),
            diagnoses_count: Some(counts.diagnoses),
            treatments_count: Some(counts.treatments),
            ..Self::from(detail.encounter)
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct EncounterMessageRes {
    pub message: String,
    pub encounter: EncounterRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct EncounterShowRes {
    pub encounter: EncounterRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListEncountersRes {
    pub encounters: Vec<EncounterRes>,
}

// -- observations -----------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CreateObservationReq {
    /// One of `TEMPERATURE`, `BLOOD_PRESSURE`, `HEART_RATE`, `OXYGEN_SATURATION`.
    #[serde(rename = "type")]
    pub observation_type: Option<String>,
    /// The reading, e.g. `37.5` or `120/80`.
    #[schema(value_type = Option<String>)]
    pub value: Option<serde_json::Value>,
    pub unit: Option<String>,
}

/// Readings arrive as strings (`"120/80"`) or as plain numbers (`37.5`); numbers keep their JSON
/// spelling. Any other shape is a `value` field error, reported together with whatever else is
/// wrong with the request.
impl TryFrom<CreateObservationReq> for ObservationInput {
    type Error = ValidationErrors;

    fn try_from(req: CreateObservationReq) -> Result<Self, Self::Error> {
        let value = match req.value {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                let rest = ObservationInput {
                    observation_type: req.observation_type,
                    value: None,
                    unit: req.unit,
                };
                let mut errors = ValidationErrors::single("value", MSG_VALUE_NOT_TEXT);
                if let Err(others) = validate_observation(&rest) {
                    for field in others.fields().filter(|f| *f != "value") {
                        for reason in others.reasons(field) {
                            errors.add(field, reason.as_str());
                        }
                    }
                }
                return Err(errors);
            }
        };
        Ok(Self {
            observation_type: req.observation_type,
            value,
            unit: req.unit,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct ObservationRes {
    pub id: i64,
    pub encounter_id: i64,
    #[serde(rename = "type")]
    pub observation_type: ObservationType,
    pub value: String,
    pub unit: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<Observation> for ObservationRes {
    fn from(o: Observation) -> Self {
        Self {
            id: o.id,
            encounter_id: o.encounter_id,
            observation_type: o.observation_type,
            value: o.value,
            unit: o.unit,
            recorded_at: o.recorded_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ObservationMessageRes {
    pub message: String,
    pub observation: ObservationRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListObservationsRes {
    pub observations: Vec<ObservationRes>,
}

// -- diagnoses --------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CreateDiagnosisReq {
    pub code: Option<String>,
    pub label: Option<String>,
    pub is_primary: Option<bool>,
}

impl From<CreateDiagnosisReq> for DiagnosisInput {
    fn from(req: CreateDiagnosisReq) -> Self {
        Self {
            code: req.code,
            label: req.label,
            is_primary: req.is_primary,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct DiagnosisRes {
    pub id: i64,
    pub encounter_id: i64,
    pub code: Option<String>,
    pub label: String,
    pub is_primary: bool,
}

impl From<Diagnosis> for DiagnosisRes {
    fn from(d: Diagnosis) -> Self {
        Self {
            id: d.id,
            encounter_id: d.encounter_id,
            code: d.code,
            label: d.label,
            is_primary: d.is_primary,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DiagnosisMessageRes {
    pub message: String,
    pub diagnosis: DiagnosisRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListDiagnosesRes {
    pub diagnoses: Vec<DiagnosisRes>,
}

// -- treatments -------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CreateTreatmentReq {
    /// One of `MEDICATION`, `PROCEDURE`, `COUNSELING`.
    #[serde(rename = "type")]
    pub treatment_type: Option<String>,
    pub description: Option<String>,
    pub dosage: Option<String>,
    /// Days; at least 1.
    pub duration: Option<i64>,
    pub notes: Option<String>,
}

impl From<CreateTreatmentReq> for TreatmentInput {
    fn from(req: CreateTreatmentReq) -> Self {
        Self {
            treatment_type: req.treatment_type,
            description: req.description,
            dosage: req.dosage,
            duration: req.duration,
            notes: req.notes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct TreatmentRes {
    pub id: i64,
    pub encounter_id: i64,
    #[serde(rename = "type")]
    pub treatment_type: TreatmentType,
    pub description: String,
    pub dosage: String,
    pub duration: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Treatment> for TreatmentRes {
    fn from(t: Treatment) -> Self {
        Self {
            id: t.id,
            encounter_id: t.encounter_id,
            treatment_type: t.treatment_type,
            description: t.description,
            dosage: t.dosage,
            duration: t.duration,
            notes: t.notes,
            created_at: t.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct TreatmentMessageRes {
    pub message: String,
    pub treatment: TreatmentRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListTreatmentsRes {
    pub treatments: Vec<TreatmentRes>,
}

// -- patients ---------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring filter.
    pub search: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct PatientReq {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `MALE` or `FEMALE`.
    pub gender: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl From<PatientReq> for PatientInput {
    fn from(req: PatientReq) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            gender: req.gender,
            date_of_birth: req.date_of_birth,
            phone: req.phone,
            national_id: req.national_id,
            address: req.address,
            emergency_contact_name: req.emergency_contact_name,
            emergency_contact_phone: req.emergency_contact_phone,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PatientRes {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub national_id: String,
    pub address: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
            gender: p.gender,
            date_of_birth: p.date_of_birth,
            phone: p.phone,
            national_id: p.national_id,
            address: p.address,
            emergency_contact_name: p.emergency_contact_name,
            emergency_contact_phone: p.emergency_contact_phone,
            created_at: p.created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PatientMessageRes {
    pub message: String,
    pub patient: PatientRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PatientShowRes {
    pub patient: PatientRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

// -- users ------------------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub name: Option<String>,
    pub email: Option<String>,
    /// `ADMIN`, `DOCTOR` or `NURSE`.
    pub role: Option<String>,
}

impl From<CreateUserReq> for UserInput {
    fn from(req: CreateUserReq) -> Self {
        Self {
            name: req.name,
            email: req.email,
            role: req.role,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserRes {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserRes {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            is_active: u.is_active,
            last_login_at: u.last_login_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserMessageRes {
    pub message: String,
    pub user: UserRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UserShowRes {
    pub user: UserRes,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListUsersRes {
    pub users: Vec<UserRes>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::models::ChildCounts;
    use serde_json::json;

    fn observation(body: serde_json::Value) -> Result<ObservationInput, ValidationErrors> {
        let req: CreateObservationReq = serde_json::from_value(body).unwrap();
        ObservationInput::try_from(req)
    }

    #[test]
    fn test_observation_value_accepts_numbers_and_strings() {
        let numeric = observation(json!({"type": "TEMPERATURE", "value": 37.5, "unit": "C"}));
        assert_eq!(numeric.unwrap().value.as_deref(), Some("37.5"));

        let input = observation(json!({"type": "BLOOD_PRESSURE", "value": "120/80"})).unwrap();
        assert_eq!(input.value.as_deref(), Some("120/80"));
        assert!(input.unit.is_none());

        let missing = observation(json!({"type": "HEART_RATE", "value": null})).unwrap();
        assert!(missing.value.is_none());
    }

    #[test]
    fn test_observation_value_rejects_structured_json() {
        for value in [json!({"systolic": 120}), json!([120, 80]), json!(true)] {
            let body = json!({"type": "BLOOD_PRESSURE", "value": value, "unit": "mmHg"});
            let errors = observation(body).unwrap_err();
            assert_eq!(errors.reasons("value"), [MSG_VALUE_NOT_TEXT]);
            assert_eq!(errors.fields().count(), 1);
        }
    }

    #[test]
    fn test_rejected_value_keeps_other_field_errors() {
        let errors = observation(json!({"type": "PULSE", "value": [1]})).unwrap_err();
        assert_eq!(errors.reasons("value"), [MSG_VALUE_NOT_TEXT]);
        assert!(errors.contains("type"));
        assert!(errors.contains("unit"));
    }

    #[test]
    fn test_encounter_counts_only_on_detail() {
        let encounter = Encounter {
            id: 1,
            patient_id: 2,
            user_id: 3,
            status: EncounterStatus::Initialized,
            started_at: None,
            ended_at: None,
            summary: None,
            created_at: Utc::now(),
        };

        let plain = serde_json::to_value(EncounterRes::from(encounter.clone())).unwrap();
        assert_eq!(plain["status"], "INITIALIZED");
        assert!(plain["started_at"].is_null());
        assert!(plain.get("observations_count").is_none());

        let detail = serde_json::to_value(EncounterRes::from(EncounterDetail {
            encounter,
            counts: ChildCounts {
                observations: 2,
                diagnoses: 1,
                treatments: 0,
            },
        }))
        .unwrap();
        assert_eq!(detail["observations_count"], 2);
        assert_eq!(detail["treatments_count"], 0);
    }
}
