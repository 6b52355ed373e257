//! Observations, diagnoses and treatments attached to an encounter.
//!
//! Creation is gated on the encounter's status (and, for treatments, on what has already been
//! recorded); see [`crate::gating`]. The gate is evaluated and the row inserted inside the same
//! transaction.

use crate::authorization::{require_role, Actor, CLINICAL_ROLES};
use crate::gating::{check_child_creation, ChildRecordKind};
use crate::models::{Diagnosis, EncounterId, Observation, Treatment};
use crate::store::{Store, StoreTx};
use crate::validation::{
    validate_diagnosis, validate_observation, validate_treatment, DiagnosisInput,
    ObservationInput, TreatmentInput,
};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug)]
pub struct ClinicalRecordService<S> {
    store: Arc<S>,
}

impl<S> Clone for ClinicalRecordService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// Loads the encounter and refuses `kind` if the gate is closed.
fn ensure_open_for(
    tx: &mut dyn StoreTx,
    encounter_id: EncounterId,
    kind: ChildRecordKind,
) -> ClinicResult<()> {
    let encounter = tx
        .find_encounter(encounter_id)?
        .ok_or_else(|| ClinicError::not_found("Encounter", encounter_id))?;
    let counts = tx.child_counts(encounter_id)?;
    check_child_creation(kind, encounter.status, counts).inspect_err(|err| {
        tracing::warn!(
            encounter_id,
            kind = kind.as_str(),
            status = %encounter.status,
            reason = %err,
            "clinical record refused"
        );
    })
}

fn ensure_exists(tx: &mut dyn StoreTx, encounter_id: EncounterId) -> ClinicResult<()> {
    match tx.find_encounter(encounter_id)? {
        Some(_) => Ok(()),
        None => Err(ClinicError::not_found("Encounter", encounter_id)),
    }
}

impl<S: Store> ClinicalRecordService<S> {
    /// Creates a clinical record service over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records a vital-sign reading. `recorded_at` is set by the server.
    ///
    /// # Errors
    ///
    /// `Validation` for bad fields, then `NotFound`, then `InvalidTransition` unless the
    /// consultation is in progress.
    pub fn create_observation(
        &self,
        actor: &Actor,
        encounter_id: EncounterId,
        input: &ObservationInput,
    ) -> ClinicResult<Observation> {
        let new = validate_observation(input)?;
        let observation = self.store.transaction(|tx| {
            ensure_open_for(tx, encounter_id, ChildRecordKind::Observation)?;
            tx.insert_observation(encounter_id, &new, Utc::now())
        })?;
        tracing::info!(
            encounter_id,
            observation_id = observation.id,
            user_id = actor.user_id,
            "observation recorded"
        );
        Ok(observation)
    }

    /// Observations of one encounter, most recent reading first.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::NotFound` if the encounter does not exist.
    pub fn list_observations(
        &self,
        _actor: &Actor,
        encounter_id: EncounterId,
    ) -> ClinicResult<Vec<Observation>> {
        self.store.transaction(|tx| {
            ensure_exists(tx, encounter_id)?;
            tx.list_observations(encounter_id)
        })
    }

    /// Records a diagnosis. A primary diagnosis demotes any earlier primary of the same
    /// encounter first, so at most one stays primary.
    pub fn create_diagnosis(
        &self,
        actor: &Actor,
        encounter_id: EncounterId,
        input: &DiagnosisInput,
    ) -> ClinicResult<Diagnosis> {
        require_role(actor, CLINICAL_ROLES)?;
        let new = validate_diagnosis(input)?;
        let (diagnosis, demoted) = self.store.transaction(|tx| {
            ensure_open_for(tx, encounter_id, ChildRecordKind::Diagnosis)?;
            let demoted = if new.is_primary {
                tx.demote_primary_diagnoses(encounter_id)?
            } else {
                0
            };
            Ok((tx.insert_diagnosis(encounter_id, &new, Utc::now())?, demoted))
        })?;
        tracing::info!(
            encounter_id,
            diagnosis_id = diagnosis.id,
            is_primary = diagnosis.is_primary,
            demoted,
            user_id = actor.user_id,
            "diagnosis recorded"
        );
        Ok(diagnosis)
    }

    /// Diagnoses of one encounter, primary first.
    pub fn list_diagnoses(
        &self,
        _actor: &Actor,
        encounter_id: EncounterId,
    ) -> ClinicResult<Vec<Diagnosis>> {
        self.store.transaction(|tx| {
            ensure_exists(tx, encounter_id)?;
            tx.list_diagnoses(encounter_id)
        })
    }

    /// Records a treatment once the encounter has at least one observation and one diagnosis.
    pub fn create_treatment(
        &self,
        actor: &Actor,
        encounter_id: EncounterId,
        input: &TreatmentInput,
    ) -> ClinicResult<Treatment> {
        require_role(actor, CLINICAL_ROLES)?;
        let new = validate_treatment(input)?;
        let treatment = self.store.transaction(|tx| {
            ensure_open_for(tx, encounter_id, ChildRecordKind::Treatment)?;
            tx.insert_treatment(encounter_id, &new, Utc::now())
        })?;
        tracing::info!(
            encounter_id,
            treatment_id = treatment.id,
            user_id = actor.user_id,
            "treatment recorded"
        );
        Ok(treatment)
    }

    /// Treatments of one encounter, newest first.
    pub fn list_treatments(
        &self,
        _actor: &Actor,
        encounter_id: EncounterId,
    ) -> ClinicResult<Vec<Treatment>> {
        self.store.transaction(|tx| {
            ensure_exists(tx, encounter_id)?;
            tx.list_treatments(encounter_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        MSG_OBSERVATION_NOT_ALLOWED, MSG_TREATMENT_NEEDS_DIAGNOSIS,
        MSG_TREATMENT_NEEDS_OBSERVATION,
    };
    use crate::models::ChildCounts;
    use crate::repositories::encounters::EncounterService;
    use crate::repositories::testing::{seed_actor, seed_patient};
    use crate::store::{MemoryStore, SqliteStore};
    use medassist_types::Role;

    struct Fixture<S> {
        encounters: EncounterService<S>,
        records: ClinicalRecordService<S>,
        actor: Actor,
        encounter_id: EncounterId,
    }

    fn fixture<S: Store>(store: S) -> Fixture<S> {
        let actor = seed_actor(&store, Role::Nurse);
        let patient = seed_patient(&store);
        let store = Arc::new(store);
        let encounters = EncounterService::new(Arc::clone(&store));
        let encounter_id = encounters.create(&actor, Some(patient.id)).unwrap().id;
        Fixture {
            encounters,
            records: ClinicalRecordService::new(store),
            actor,
            encounter_id,
        }
    }

    fn temperature() -> ObservationInput {
        ObservationInput {
            observation_type: Some("TEMPERATURE".into()),
            value: Some("37.5".into()),
            unit: Some("°C".into()),
        }
    }

    fn malaria(is_primary: bool) -> DiagnosisInput {
        DiagnosisInput {
            code: Some("B54".into()),
            label: Some("Malaria".into()),
            is_primary: Some(is_primary),
        }
    }

    fn paracetamol() -> TreatmentInput {
        TreatmentInput {
            treatment_type: Some("MEDICATION".into()),
            description: Some("Paracetamol 500mg".into()),
            dosage: Some("2x daily".into()),
            duration: Some(5),
            notes: None,
        }
    }

    fn counts<S: Store>(f: &Fixture<S>) -> ChildCounts {
        f.encounters.get(&f.actor, f.encounter_id).unwrap().counts
    }

    fn observation_before_start<S: Store>(f: Fixture<S>) {
        let err = f
            .records
            .create_observation(&f.actor, f.encounter_id, &temperature())
            .unwrap_err();
        assert!(
            matches!(&err, ClinicError::InvalidTransition(m) if m == MSG_OBSERVATION_NOT_ALLOWED)
        );
        assert_eq!(counts(&f).observations, 0);
    }

    #[test]
    fn test_observation_refused_before_start() {
        observation_before_start(fixture(MemoryStore::new()));
        observation_before_start(fixture(SqliteStore::open_in_memory().unwrap()));
    }

    fn full_consultation<S: Store>(f: Fixture<S>) {
        f.encounters.start(&f.actor, f.encounter_id).unwrap();

        let observation = f
            .records
            .create_observation(&f.actor, f.encounter_id, &temperature())
            .unwrap();
        assert_eq!(observation.value, "37.5");
        assert_eq!(observation.unit, "°C");

        let diagnosis = f
            .records
            .create_diagnosis(&f.actor, f.encounter_id, &malaria(true))
            .unwrap();
        assert!(diagnosis.is_primary);

        let treatment = f
            .records
            .create_treatment(&f.actor, f.encounter_id, &paracetamol())
            .unwrap();
        assert_eq!(treatment.duration, 5);

        assert_eq!(
            counts(&f),
            ChildCounts {
                observations: 1,
                diagnoses: 1,
                treatments: 1
            }
        );
    }

    #[test]
    fn test_full_consultation_records_everything() {
        full_consultation(fixture(MemoryStore::new()));
        full_consultation(fixture(SqliteStore::open_in_memory().unwrap()));
    }

    fn treatment_gate<S: Store>(f: Fixture<S>) {
        f.encounters.start(&f.actor, f.encounter_id).unwrap();

        let err = f
            .records
            .create_treatment(&f.actor, f.encounter_id, &paracetamol())
            .unwrap_err();
        assert!(
            matches!(&err, ClinicError::InvalidTransition(m) if m == MSG_TREATMENT_NEEDS_OBSERVATION)
        );

        f.records
            .create_observation(&f.actor, f.encounter_id, &temperature())
            .unwrap();
        let err = f
            .records
            .create_treatment(&f.actor, f.encounter_id, &paracetamol())
            .unwrap_err();
        assert!(
            matches!(&err, ClinicError::InvalidTransition(m) if m == MSG_TREATMENT_NEEDS_DIAGNOSIS)
        );
        assert_eq!(counts(&f).treatments, 0);
    }

    #[test]
    fn test_treatment_needs_observation_and_diagnosis() {
        treatment_gate(fixture(MemoryStore::new()));
        treatment_gate(fixture(SqliteStore::open_in_memory().unwrap()));
    }

    fn primary_arbitration<S: Store>(f: Fixture<S>) {
        f.encounters.start(&f.actor, f.encounter_id).unwrap();
        let first = f
            .records
            .create_diagnosis(&f.actor, f.encounter_id, &malaria(true))
            .unwrap();
        f.records
            .create_diagnosis(&f.actor, f.encounter_id, &malaria(false))
            .unwrap();
        let second = f
            .records
            .create_diagnosis(&f.actor, f.encounter_id, &malaria(true))
            .unwrap();

        let listed = f.records.list_diagnoses(&f.actor, f.encounter_id).unwrap();
        let primaries: Vec<i64> = listed.iter().filter(|d| d.is_primary).map(|d| d.id).collect();
        assert_eq!(primaries, vec![second.id]);
        assert_eq!(listed[0].id, second.id);
        assert!(listed.iter().any(|d| d.id == first.id && !d.is_primary));
    }

    #[test]
    fn test_single_primary_after_each_insert() {
        primary_arbitration(fixture(MemoryStore::new()));
        primary_arbitration(fixture(SqliteStore::open_in_memory().unwrap()));
    }

    #[test]
    fn test_closed_encounter_refuses_records() {
        let f = fixture(SqliteStore::open_in_memory().unwrap());
        f.encounters.start(&f.actor, f.encounter_id).unwrap();
        f.encounters.cancel(&f.actor, f.encounter_id).unwrap();

        let err = f
            .records
            .create_diagnosis(&f.actor, f.encounter_id, &malaria(true))
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidTransition(_)));
    }

    #[test]
    fn test_field_validation_precedes_lookup() {
        let f = fixture(MemoryStore::new());
        let err = f
            .records
            .create_observation(&f.actor, 9_999, &ObservationInput::default())
            .unwrap_err();
        match err {
            ClinicError::Validation(errors) => {
                assert!(errors.contains("type"));
                assert!(errors.contains("value"));
                assert!(errors.contains("unit"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = f
            .records
            .create_observation(&f.actor, 9_999, &temperature())
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { .. }));
    }

    #[test]
    fn test_listing_unknown_encounter_is_not_found() {
        let f = fixture(MemoryStore::new());
        assert!(matches!(
            f.records.list_treatments(&f.actor, 9_999).unwrap_err(),
            ClinicError::NotFound { .. }
        ));
    }

    #[test]
    fn test_observations_listed_newest_first() {
        let f = fixture(SqliteStore::open_in_memory().unwrap());
        f.encounters.start(&f.actor, f.encounter_id).unwrap();
        let older = f
            .records
            .create_observation(&f.actor, f.encounter_id, &temperature())
            .unwrap();
        let newer = f
            .records
            .create_observation(
                &f.actor,
                f.encounter_id,
                &ObservationInput {
                    observation_type: Some("BLOOD_PRESSURE".into()),
                    value: Some("120/80".into()),
                    unit: Some("mmHg".into()),
                },
            )
            .unwrap();

        let listed = f.records.list_observations(&f.actor, f.encounter_id).unwrap();
        assert_eq!(
            listed.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
    }
}
