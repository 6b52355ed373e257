//! Patient directory.

use crate::authorization::{require_role, Actor, ADMIN_ROLES, CLINICAL_ROLES};
use crate::models::{Patient, PatientFields, PatientId};
use crate::store::{Store, StoreTx};
use crate::validation::{taken_message, validate_patient, PatientInput};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use medassist_types::ValidationErrors;
use std::sync::Arc;

#[derive(Debug)]
pub struct PatientService<S> {
    store: Arc<S>,
}

impl<S> Clone for PatientService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

/// Rejects `fields` if its phone or national id belongs to another patient.
fn ensure_unique(
    tx: &mut dyn StoreTx,
    fields: &PatientFields,
    exclude: Option<PatientId>,
) -> ClinicResult<()> {
    let conflicts = tx.patient_conflicts(&fields.phone, &fields.national_id, exclude)?;
    let mut errors = ValidationErrors::new();
    if conflicts.phone {
        errors.add("phone", taken_message("phone"));
    }
    if conflicts.national_id {
        errors.add("national_id", taken_message("national_id"));
    }
    Ok(errors.into_result(())?)
}

impl<S: Store> PatientService<S> {
    /// Creates a patient directory service.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the patient table
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All patients, optionally narrowed by a case-insensitive substring match on names, phone
    /// numbers, national id and address.
    pub fn list(&self, _actor: &Actor, search: Option<&str>) -> ClinicResult<Vec<Patient>> {
        self.store.transaction(|tx| tx.list_patients(search))
    }

    /// Fetches one patient.
    ///
    /// # Arguments
    ///
    /// * `_actor` - Requesting user; every active role may read the directory
    /// * `patient_id` - Id of the patient
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::NotFound` if no patient has this id.
    pub fn get(&self, _actor: &Actor, patient_id: PatientId) -> ClinicResult<Patient> {
        self.store.transaction(|tx| {
            tx.find_patient(patient_id)?
                .ok_or_else(|| ClinicError::not_found("Patient", patient_id))
        })
    }

    /// Registers a patient.
    ///
    /// # Errors
    ///
    /// - `Forbidden` without a clinical role.
    /// - `Validation` for bad fields or a phone or national id already on file.
    pub fn create(&self, actor: &Actor, input: &PatientInput) -> ClinicResult<Patient> {
        require_role(actor, CLINICAL_ROLES)?;
        let fields = validate_patient(input)?;
        let patient = self.store.transaction(|tx| {
            ensure_unique(tx, &fields, None)?;
            tx.insert_patient(&fields, Utc::now())
        })?;
        tracing::info!(patient_id = patient.id, user_id = actor.user_id, "patient created");
        Ok(patient)
    }

    /// Replaces every attribute of the patient. Uniqueness ignores the patient's own values.
    pub fn update(
        &self,
        actor: &Actor,
        patient_id: PatientId,
        input: &PatientInput,
    ) -> ClinicResult<Patient> {
        require_role(actor, CLINICAL_ROLES)?;
        let fields = validate_patient(input)?;
        let patient = self.store.transaction(|tx| {
            if tx.find_patient(patient_id)?.is_none() {
                return Err(ClinicError::not_found("Patient", patient_id));
            }
            ensure_unique(tx, &fields, Some(patient_id))?;
            tx.update_patient(patient_id, &fields)?;
            tx.find_patient(patient_id)?
                .ok_or_else(|| ClinicError::not_found("Patient", patient_id))
        })?;
        tracing::info!(patient_id, user_id = actor.user_id, "patient updated");
        Ok(patient)
    }

    /// Deletes the patient together with all of their encounters and clinical records.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless the actor is an administrator; `NotFound` for an unknown patient.
    pub fn delete(&self, actor: &Actor, patient_id: PatientId) -> ClinicResult<()> {
        require_role(actor, ADMIN_ROLES)?;
        let removed = self
            .store
            .transaction(|tx| tx.delete_patient_cascade(patient_id))?;
        if !removed {
            return Err(ClinicError::not_found("Patient", patient_id));
        }
        tracing::info!(patient_id, user_id = actor.user_id, "patient deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::clinical_records::ClinicalRecordService;
    use crate::repositories::encounters::EncounterService;
    use crate::repositories::testing::seed_actor;
    use crate::store::{MemoryStore, SqliteStore};
    use crate::validation::ObservationInput;
    use medassist_types::Role;

    fn input(phone: &str, national_id: &str) -> PatientInput {
        PatientInput {
            first_name: Some("Eric".into()),
            last_name: Some("Habimana".into()),
            gender: Some("MALE".into()),
            date_of_birth: Some("1984-02-29".into()),
            phone: Some(phone.into()),
            national_id: Some(national_id.into()),
            address: Some("Musanze".into()),
            emergency_contact_name: Some("Alice Habimana".into()),
            emergency_contact_phone: Some("0722000111".into()),
        }
    }

    fn uniqueness<S: Store>(store: S) {
        let actor = seed_actor(&store, Role::Nurse);
        let svc = PatientService::new(Arc::new(store));
        let first = svc
            .create(&actor, &input("0788111222", "1198480012345670"))
            .unwrap();

        let err = svc
            .create(&actor, &input("0788111222", "1198480012345670"))
            .unwrap_err();
        match err {
            ClinicError::Validation(errors) => {
                assert_eq!(errors.reasons("phone"), ["The phone has already been taken."]);
                assert!(errors.contains("national_id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut renamed = input("0788111222", "1198480012345670");
        renamed.first_name = Some("Erica".into());
        let updated = svc.update(&actor, first.id, &renamed).unwrap();
        assert_eq!(updated.first_name, "Erica");
        assert_eq!(updated.created_at, first.created_at);
    }

    #[test]
    fn test_phone_and_national_id_are_unique() {
        uniqueness(MemoryStore::new());
        uniqueness(SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let store = MemoryStore::new();
        let actor = seed_actor(&store, Role::Doctor);
        let svc = PatientService::new(Arc::new(store));
        svc.create(&actor, &input("0788111222", "1198480012345670"))
            .unwrap();

        assert_eq!(svc.list(&actor, Some("habim")).unwrap().len(), 1);
        assert_eq!(svc.list(&actor, Some("0788111")).unwrap().len(), 1);
        assert!(svc.list(&actor, Some("kigali")).unwrap().is_empty());
        assert_eq!(svc.list(&actor, Some("  ")).unwrap().len(), 1);
    }

    #[test]
    fn test_update_unknown_patient_is_not_found() {
        let store = MemoryStore::new();
        let actor = seed_actor(&store, Role::Doctor);
        let svc = PatientService::new(Arc::new(store));
        let err = svc
            .update(&actor, 41, &input("0788111222", "1198480012345670"))
            .unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { entity: "Patient", id: 41 }));
    }

    fn cascade<S: Store>(store: S) {
        let admin = seed_actor(&store, Role::Admin);
        let store = Arc::new(store);
        let patients = PatientService::new(Arc::clone(&store));
        let encounters = EncounterService::new(Arc::clone(&store));
        let records = ClinicalRecordService::new(Arc::clone(&store));

        let patient = patients
            .create(&admin, &input("0788111222", "1198480012345670"))
            .unwrap();
        let encounter = encounters.create(&admin, Some(patient.id)).unwrap();
        encounters.start(&admin, encounter.id).unwrap();
        records
            .create_observation(
                &admin,
                encounter.id,
                &ObservationInput {
                    observation_type: Some("HEART_RATE".into()),
                    value: Some("72".into()),
                    unit: Some("bpm".into()),
                },
            )
            .unwrap();

        patients.delete(&admin, patient.id).unwrap();

        assert!(matches!(
            patients.get(&admin, patient.id).unwrap_err(),
            ClinicError::NotFound { .. }
        ));
        assert!(matches!(
            encounters.get(&admin, encounter.id).unwrap_err(),
            ClinicError::NotFound { .. }
        ));
        assert!(matches!(
            records.list_observations(&admin, encounter.id).unwrap_err(),
            ClinicError::NotFound { .. }
        ));
        assert!(matches!(
            patients.delete(&admin, patient.id).unwrap_err(),
            ClinicError::NotFound { .. }
        ));
    }

    #[test]
    fn test_delete_cascades_to_clinical_records() {
        cascade(MemoryStore::new());
        cascade(SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_only_admin_deletes() {
        let store = MemoryStore::new();
        let doctor = seed_actor(&store, Role::Doctor);
        let svc = PatientService::new(Arc::new(store));
        let patient = svc
            .create(&doctor, &input("0788111222", "1198480012345670"))
            .unwrap();

        let err = svc.delete(&doctor, patient.id).unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));
        assert!(svc.get(&doctor, patient.id).is_ok());
    }
}
