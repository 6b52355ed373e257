use super::{normalise_search, Store, StoreTx};
use crate::lifecycle::EncounterUpdate;
use crate::models::{
    ChildCounts, Diagnosis, Encounter, EncounterFilter, EncounterId, NewDiagnosis, NewEncounter,
    NewObservation, NewTreatment, NewUser, Observation, Patient, PatientConflicts, PatientFields,
    PatientId, Treatment, User, UserId,
};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use medassist_types::EncounterStatus;
use std::cmp::Ordering;
use std::sync::Mutex;

/// In-process store used as a test double.
///
/// A transaction works on a copy of the tables and swaps it in only when the closure succeeds;
/// the mutex serialises transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut dyn StoreTx) -> ClinicResult<T>,
    ) -> ClinicResult<T> {
        let mut committed = self.tables.lock().map_err(|_| ClinicError::StorePoisoned)?;
        let mut working = committed.clone();
        let out = f(&mut working)?;
        *committed = working;
        Ok(out)
    }
}

#[derive(Clone, Debug, Default)]
struct Tables {
    last_id: i64,
    patients: Vec<Patient>,
    users: Vec<User>,
    encounters: Vec<Encounter>,
    observations: Vec<Observation>,
    diagnoses: Vec<Diagnosis>,
    treatments: Vec<Treatment>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn require_encounter(&self, id: EncounterId) -> ClinicResult<()> {
        if self.encounters.iter().any(|e| e.id == id) {
            Ok(())
        } else {
            Err(ClinicError::not_found("Encounter", id))
        }
    }
}

fn newest_start_first(a: &Encounter, b: &Encounter) -> Ordering {
    let by_start = match (a.started_at, b.started_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_start.then(b.id.cmp(&a.id))
}

fn matches_any(search: &str, columns: &[&str]) -> bool {
    columns.iter().any(|c| c.to_lowercase().contains(search))
}

fn patient_from_fields(id: PatientId, fields: &PatientFields, created_at: DateTime<Utc>) -> Patient {
    Patient {
        id,
        first_name: fields.first_name.to_string(),
        last_name: fields.last_name.to_string(),
        gender: fields.gender,
        date_of_birth: fields.date_of_birth,
        phone: fields.phone.clone(),
        national_id: fields.national_id.clone(),
        address: fields.address.to_string(),
        emergency_contact_name: fields.emergency_contact_name.to_string(),
        emergency_contact_phone: fields.emergency_contact_phone.clone(),
        created_at,
    }
}

impl StoreTx for Tables {
    fn insert_encounter(
        &mut self,
        new: &NewEncounter,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Encounter> {
        let encounter = Encounter {
            id: self.next_id(),
            patient_id: new.patient_id,
            user_id: new.user_id,
            status: EncounterStatus::Initialized,
            started_at: None,
            ended_at: None,
            summary: None,
            created_at,
        };
        self.encounters.push(encounter.clone());
        Ok(encounter)
    }

    fn find_encounter(&mut self, id: EncounterId) -> ClinicResult<Option<Encounter>> {
        Ok(self.encounters.iter().find(|e| e.id == id).cloned())
    }

    fn list_encounters(&mut self, filter: &EncounterFilter) -> ClinicResult<Vec<Encounter>> {
        let mut found: Vec<Encounter> = self
            .encounters
            .iter()
            .filter(|e| filter.patient_id.map_or(true, |p| e.patient_id == p))
            .filter(|e| filter.status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        found.sort_by(newest_start_first);
        Ok(found)
    }

    fn apply_encounter_update(&mut self, update: &EncounterUpdate) -> ClinicResult<bool> {
        match self
            .encounters
            .iter_mut()
            .find(|e| e.id == update.encounter_id && e.status == update.expected_status)
        {
            Some(encounter) => {
                update.apply_to(encounter);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn child_counts(&mut self, encounter_id: EncounterId) -> ClinicResult<ChildCounts> {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        Ok(ChildCounts {
            observations: count(
                self.observations
                    .iter()
                    .filter(|o| o.encounter_id == encounter_id)
                    .count(),
            ),
            diagnoses: count(
                self.diagnoses
                    .iter()
                    .filter(|d| d.encounter_id == encounter_id)
                    .count(),
            ),
            treatments: count(
                self.treatments
                    .iter()
                    .filter(|t| t.encounter_id == encounter_id)
                    .count(),
            ),
        })
    }

    fn insert_observation(
        &mut self,
        encounter_id: EncounterId,
        new: &NewObservation,
        recorded_at: DateTime<Utc>,
    ) -> ClinicResult<Observation> {
        self.require_encounter(encounter_id)?;
        let observation = Observation {
            id: self.next_id(),
            encounter_id,
            observation_type: new.observation_type,
            value: new.value.to_string(),
            unit: new.unit.to_string(),
            recorded_at,
        };
        self.observations.push(observation.clone());
        Ok(observation)
    }

    fn list_observations(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Observation>> {
        let mut found: Vec<Observation> = self
            .observations
            .iter()
            .filter(|o| o.encounter_id == encounter_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    fn demote_primary_diagnoses(&mut self, encounter_id: EncounterId) -> ClinicResult<usize> {
        let mut demoted = 0;
        for diagnosis in self
            .diagnoses
            .iter_mut()
            .filter(|d| d.encounter_id == encounter_id && d.is_primary)
        {
            diagnosis.is_primary = false;
            demoted += 1;
        }
        Ok(demoted)
    }

    fn insert_diagnosis(
        &mut self,
        encounter_id: EncounterId,
        new: &NewDiagnosis,
        _created_at: DateTime<Utc>,
    ) -> ClinicResult<Diagnosis> {
        self.require_encounter(encounter_id)?;
        let diagnosis = Diagnosis {
            id: self.next_id(),
            encounter_id,
            code: new.code.as_ref().map(ToString::to_string),
            label: new.label.to_string(),
            is_primary: new.is_primary,
        };
        self.diagnoses.push(diagnosis.clone());
        Ok(diagnosis)
    }

    fn list_diagnoses(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Diagnosis>> {
        let mut found: Vec<Diagnosis> = self
            .diagnoses
            .iter()
            .filter(|d| d.encounter_id == encounter_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.is_primary.cmp(&a.is_primary).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    fn insert_treatment(
        &mut self,
        encounter_id: EncounterId,
        new: &NewTreatment,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Treatment> {
        self.require_encounter(encounter_id)?;
        let treatment = Treatment {
            id: self.next_id(),
            encounter_id,
            treatment_type: new.treatment_type,
            description: new.description.to_string(),
            dosage: new.dosage.to_string(),
            duration: new.duration,
            notes: new.notes.as_ref().map(ToString::to_string),
            created_at,
        };
        self.treatments.push(treatment.clone());
        Ok(treatment)
    }

    fn list_treatments(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Treatment>> {
        let mut found: Vec<Treatment> = self
            .treatments
            .iter()
            .filter(|t| t.encounter_id == encounter_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    fn insert_patient(
        &mut self,
        fields: &PatientFields,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Patient> {
        let patient = patient_from_fields(self.next_id(), fields, created_at);
        self.patients.push(patient.clone());
        Ok(patient)
    }

    fn find_patient(&mut self, id: PatientId) -> ClinicResult<Option<Patient>> {
        Ok(self.patients.iter().find(|p| p.id == id).cloned())
    }

    fn update_patient(&mut self, id: PatientId, fields: &PatientFields) -> ClinicResult<bool> {
        match self.patients.iter_mut().find(|p| p.id == id) {
            Some(patient) => {
                *patient = patient_from_fields(id, fields, patient.created_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_patient_cascade(&mut self, id: PatientId) -> ClinicResult<bool> {
        if !self.patients.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        let encounter_ids: Vec<EncounterId> = self
            .encounters
            .iter()
            .filter(|e| e.patient_id == id)
            .map(|e| e.id)
            .collect();
        self.treatments
            .retain(|t| !encounter_ids.contains(&t.encounter_id));
        self.diagnoses
            .retain(|d| !encounter_ids.contains(&d.encounter_id));
        self.observations
            .retain(|o| !encounter_ids.contains(&o.encounter_id));
        self.encounters.retain(|e| e.patient_id != id);
        self.patients.retain(|p| p.id != id);
        Ok(true)
    }

    fn list_patients(&mut self, search: Option<&str>) -> ClinicResult<Vec<Patient>> {
        let search = normalise_search(search);
        Ok(self
            .patients
            .iter()
            .filter(|p| match &search {
                None => true,
                Some(term) => matches_any(
                    term,
                    &[
                        &p.first_name,
                        &p.last_name,
                        &p.phone,
                        &p.national_id,
                        &p.address,
                        &p.emergency_contact_name,
                        &p.emergency_contact_phone,
                    ],
                ),
            })
            .cloned()
            .collect())
    }

    fn patient_conflicts(
        &mut self,
        phone: &str,
        national_id: &str,
        exclude: Option<PatientId>,
    ) -> ClinicResult<PatientConflicts> {
        let others = || self.patients.iter().filter(|p| Some(p.id) != exclude);
        Ok(PatientConflicts {
            phone: others().any(|p| p.phone == phone),
            national_id: others().any(|p| p.national_id == national_id),
        })
    }

    fn insert_user(&mut self, new: &NewUser, _created_at: DateTime<Utc>) -> ClinicResult<User> {
        let user = User {
            id: self.next_id(),
            name: new.name.to_string(),
            email: new.email.clone(),
            role: new.role,
            is_active: true,
            last_login_at: None,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn find_user(&mut self, id: UserId) -> ClinicResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    fn list_users(&mut self, search: Option<&str>) -> ClinicResult<Vec<User>> {
        let search = normalise_search(search);
        Ok(self
            .users
            .iter()
            .filter(|u| match &search {
                None => true,
                Some(term) => matches_any(term, &[&u.name, &u.email]),
            })
            .cloned()
            .collect())
    }

    fn user_email_taken(&mut self, email: &str) -> ClinicResult<bool> {
        Ok(self.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    fn count_users(&mut self) -> ClinicResult<u64> {
        Ok(self.users.len() as u64)
    }

    fn set_user_active(&mut self, id: UserId, is_active: bool) -> ClinicResult<bool> {
        match self.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
