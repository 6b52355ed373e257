//! Persistence interface.
//!
//! A [`Store`] runs a closure inside one transaction and hands it a [`StoreTx`]: either the whole
//! closure commits or none of it does. Two implementations ship with the crate:
//! - [`SqliteStore`], the production store (rusqlite, `BEGIN IMMEDIATE` transactions)
//! - [`MemoryStore`], an in-process test double with the same all-or-nothing semantics

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{count_tables, open_connection, run_migrations, SqliteStore};

use crate::lifecycle::EncounterUpdate;
use crate::models::{
    ChildCounts, Diagnosis, Encounter, EncounterFilter, EncounterId, NewDiagnosis, NewEncounter,
    NewObservation, NewTreatment, NewUser, Observation, Patient, PatientConflicts, PatientFields,
    PatientId, Treatment, User, UserId,
};
use crate::ClinicResult;
use chrono::{DateTime, Utc};

/// Transactional access to the entity store.
pub trait Store: Send + Sync {
    /// Runs `f` in a single transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it returns `Err`. While
    /// `f` runs no other transaction on the same store can write, so a read made through the
    /// `StoreTx` stays valid until the closure returns.
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut dyn StoreTx) -> ClinicResult<T>,
    ) -> ClinicResult<T>;
}

/// Operations available inside a [`Store::transaction`].
pub trait StoreTx {
    // -- encounters ---------------------------------------------------------------------------

    /// Inserts a new encounter in `INITIALIZED`.
    fn insert_encounter(
        &mut self,
        new: &NewEncounter,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Encounter>;

    fn find_encounter(&mut self, id: EncounterId) -> ClinicResult<Option<Encounter>>;

    /// Encounters matching `filter`, most recently started first; not-yet-started ones last.
    fn list_encounters(&mut self, filter: &EncounterFilter) -> ClinicResult<Vec<Encounter>>;

    /// Applies a lifecycle command if the row still has `update.expected_status`.
    ///
    /// Returns `false` when no row matched (the encounter moved on or vanished).
    fn apply_encounter_update(&mut self, update: &EncounterUpdate) -> ClinicResult<bool>;

    fn child_counts(&mut self, encounter_id: EncounterId) -> ClinicResult<ChildCounts>;

    // -- clinical records ---------------------------------------------------------------------

    fn insert_observation(
        &mut self,
        encounter_id: EncounterId,
        new: &NewObservation,
        recorded_at: DateTime<Utc>,
    ) -> ClinicResult<Observation>;

    /// Newest reading first.
    fn list_observations(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Observation>>;

    /// Clears `is_primary` on every diagnosis of the encounter; returns how many were demoted.
    fn demote_primary_diagnoses(&mut self, encounter_id: EncounterId) -> ClinicResult<usize>;

    fn insert_diagnosis(
        &mut self,
        encounter_id: EncounterId,
        new: &NewDiagnosis,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Diagnosis>;

    /// Primary diagnosis first, then in insertion order.
    fn list_diagnoses(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Diagnosis>>;

    fn insert_treatment(
        &mut self,
        encounter_id: EncounterId,
        new: &NewTreatment,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Treatment>;

    /// Newest first.
    fn list_treatments(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Treatment>>;

    // -- patients -----------------------------------------------------------------------------

    fn insert_patient(
        &mut self,
        fields: &PatientFields,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Patient>;

    fn find_patient(&mut self, id: PatientId) -> ClinicResult<Option<Patient>>;

    /// Returns `false` if the patient does not exist.
    fn update_patient(&mut self, id: PatientId, fields: &PatientFields) -> ClinicResult<bool>;

    /// Deletes the patient and every encounter, observation, diagnosis and treatment hanging off
    /// it. Returns `false` if the patient does not exist.
    fn delete_patient_cascade(&mut self, id: PatientId) -> ClinicResult<bool>;

    /// Case-insensitive substring search across the patient's text columns.
    fn list_patients(&mut self, search: Option<&str>) -> ClinicResult<Vec<Patient>>;

    /// Which of `phone` / `national_id` are held by a patient other than `exclude`.
    fn patient_conflicts(
        &mut self,
        phone: &str,
        national_id: &str,
        exclude: Option<PatientId>,
    ) -> ClinicResult<PatientConflicts>;

    // -- users --------------------------------------------------------------------------------

    fn insert_user(&mut self, new: &NewUser, created_at: DateTime<Utc>) -> ClinicResult<User>;

    fn find_user(&mut self, id: UserId) -> ClinicResult<Option<User>>;

    /// Case-insensitive substring search on name and email.
    fn list_users(&mut self, search: Option<&str>) -> ClinicResult<Vec<User>>;

    fn user_email_taken(&mut self, email: &str) -> ClinicResult<bool>;

    fn count_users(&mut self) -> ClinicResult<u64>;

    /// Returns `false` if the user does not exist.
    fn set_user_active(&mut self, id: UserId, is_active: bool) -> ClinicResult<bool>;
}

/// Lowercased, trimmed search term; `None` when blank.
pub(crate) fn normalise_search(search: Option<&str>) -> Option<String> {
    search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}
