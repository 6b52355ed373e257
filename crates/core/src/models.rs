//! Domain records.
//!
//! `New*` structs carry already-validated input for an insert; the plain structs are what the
//! store hands back. Only the lifecycle engine produces values for an encounter's `status`,
//! `started_at`, `ended_at` and `summary`.

use chrono::{DateTime, NaiveDate, Utc};
use medassist_types::{
    EncounterStatus, Gender, NonEmptyText, ObservationType, Role, TreatmentType,
};
use serde::Serialize;

pub type PatientId = i64;
pub type UserId = i64;
pub type EncounterId = i64;

/// One clinical consultation episode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub patient_id: PatientId,
    /// The attending user who opened the consultation.
    pub user_id: UserId,
    pub status: EncounterStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEncounter {
    pub patient_id: PatientId,
    pub user_id: UserId,
}

/// Number of child records attached to an encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChildCounts {
    pub observations: u32,
    pub diagnoses: u32,
    pub treatments: u32,
}

/// An encounter together with its child record counts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncounterDetail {
    pub encounter: Encounter,
    pub counts: ChildCounts,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncounterFilter {
    pub patient_id: Option<PatientId>,
    pub status: Option<EncounterStatus>,
}

/// One vital-sign reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub id: i64,
    pub encounter_id: EncounterId,
    #[serde(rename = "type")]
    pub observation_type: ObservationType,
    /// Kept as text so composite readings such as `120/80` survive unchanged.
    pub value: String,
    pub unit: String,
    /// Assigned by the server at creation.
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewObservation {
    pub observation_type: ObservationType,
    pub value: NonEmptyText,
    pub unit: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub id: i64,
    pub encounter_id: EncounterId,
    pub code: Option<String>,
    pub label: String,
    pub is_primary: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewDiagnosis {
    pub code: Option<NonEmptyText>,
    pub label: NonEmptyText,
    pub is_primary: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Treatment {
    pub id: i64,
    pub encounter_id: EncounterId,
    #[serde(rename = "type")]
    pub treatment_type: TreatmentType,
    pub description: String,
    pub dosage: String,
    /// Days.
    pub duration: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTreatment {
    pub treatment_type: TreatmentType,
    pub description: NonEmptyText,
    pub dosage: NonEmptyText,
    pub duration: u32,
    pub notes: Option<NonEmptyText>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Patient {
    pub id: PatientId,
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

/// Validated patient attributes, used for both create and update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientFields {
    pub first_name: NonEmptyText,
    pub last_name: NonEmptyText,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    pub national_id: String,
    pub address: NonEmptyText,
    pub emergency_contact_name: NonEmptyText,
    pub emergency_contact_phone: String,
}

/// Which unique patient columns are already held by another patient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatientConflicts {
    pub phone: bool,
    pub national_id: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub name: NonEmptyText,
    pub email: String,
    pub role: Role,
}
