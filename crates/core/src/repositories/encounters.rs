//! Encounter lifecycle service.
//!
//! Wraps the pure transition rules in [`crate::lifecycle`] with persistence: each of
//! [`start`](EncounterService::start), [`end`](EncounterService::end) and
//! [`cancel`](EncounterService::cancel) loads the encounter, plans the transition and writes it
//! back inside one store transaction. The write is guarded by the status that was read, so two
//! racing commands on the same encounter cannot both succeed.

use crate::authorization::{require_role, Actor, CLINICAL_ROLES};
use crate::lifecycle::{plan_transition, Transition};
use crate::models::{Encounter, EncounterDetail, EncounterFilter, EncounterId, NewEncounter};
use crate::store::Store;
use crate::validation::{validate_patient_reference, validate_summary};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use medassist_types::ValidationErrors;
use std::sync::Arc;

#[derive(Debug)]
pub struct EncounterService<S> {
    store: Arc<S>,
}

impl<S> Clone for EncounterService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> EncounterService<S> {
    /// Creates an encounter service over a shared store.
    ///
    /// # Arguments
    ///
    /// * `store` - Store every lifecycle write goes through
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Opens a new encounter for `patient_id` with the actor as attending user.
    ///
    /// The encounter starts in `INITIALIZED` with no timestamps.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the actor has no clinical role.
    /// - `Validation` if `patient_id` is missing or names no patient.
    pub fn create(&self, actor: &Actor, patient_id: Option<i64>) -> ClinicResult<Encounter> {
        require_role(actor, CLINICAL_ROLES)?;
        let patient_id = validate_patient_reference(patient_id)?;

        let encounter = self.store.transaction(|tx| {
            if tx.find_patient(patient_id)?.is_none() {
                return Err(ValidationErrors::single(
                    "patient_id",
                    "The selected patient id is invalid.",
                )
                .into());
            }
            tx.insert_encounter(
                &NewEncounter {
                    patient_id,
                    user_id: actor.user_id,
                },
                Utc::now(),
            )
        })?;

        tracing::info!(
            encounter_id = encounter.id,
            patient_id,
            user_id = actor.user_id,
            "encounter created"
        );
        Ok(encounter)
    }

    /// The encounter with its child record counts.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn get(&self, actor: &Actor, encounter_id: EncounterId) -> ClinicResult<EncounterDetail> {
        tracing::debug!(encounter_id, user_id = actor.user_id, "loading encounter");
        self.store.transaction(|tx| {
            let encounter = tx
                .find_encounter(encounter_id)?
                .ok_or_else(|| ClinicError::not_found("Encounter", encounter_id))?;
            let counts = tx.child_counts(encounter_id)?;
            Ok(EncounterDetail { encounter, counts })
        })
    }

    /// Lists encounters matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `actor` - Requesting user; any active role may list
    /// * `filter` - Optional patient and status constraints
    ///
    /// # Returns
    ///
    /// Encounters ordered by `started_at`, newest first. Unstarted encounters come last,
    /// newest id first.
    pub fn list(&self, actor: &Actor, filter: &EncounterFilter) -> ClinicResult<Vec<Encounter>> {
        tracing::debug!(user_id = actor.user_id, ?filter, "listing encounters");
        self.store.transaction(|tx| tx.list_encounters(filter))
    }

    /// `INITIALIZED` to `IN_PROGRESS`; stamps `started_at`.
    pub fn start(&self, actor: &Actor, encounter_id: EncounterId) -> ClinicResult<Encounter> {
        self.transition(actor, encounter_id, Transition::Start)
    }

    /// `IN_PROGRESS` to `COMPLETED`; stamps `ended_at` and records the summary.
    ///
    /// # Errors
    ///
    /// A missing or blank `summary` is a `Validation` error, reported before the encounter is
    /// looked up.
    pub fn end(
        &self,
        actor: &Actor,
        encounter_id: EncounterId,
        summary: Option<&str>,
    ) -> ClinicResult<Encounter> {
        let summary = validate_summary(summary)?;
        self.transition(actor, encounter_id, Transition::End { summary })
    }

    /// `IN_PROGRESS` to `CANCELED`; stamps `ended_at`.
    pub fn cancel(&self, actor: &Actor, encounter_id: EncounterId) -> ClinicResult<Encounter> {
        self.transition(actor, encounter_id, Transition::Cancel)
    }

    fn transition(
        &self,
        actor: &Actor,
        encounter_id: EncounterId,
        transition: Transition,
    ) -> ClinicResult<Encounter> {
        let name = transition.name();
        let result = self.store.transaction(|tx| {
            let current = tx
                .find_encounter(encounter_id)?
                .ok_or_else(|| ClinicError::not_found("Encounter", encounter_id))?;
            let stale = transition.rejected();
            let plan = plan_transition(&current, transition, Utc::now())?;
            if !tx.apply_encounter_update(&plan.update)? {
                return Err(stale);
            }
            Ok((current.status, plan.encounter))
        });

        match result {
            Ok((from, encounter)) => {
                tracing::info!(
                    encounter_id,
                    user_id = actor.user_id,
                    transition = name,
                    from = %from,
                    to = %encounter.status,
                    "encounter transitioned"
                );
                Ok(encounter)
            }
            Err(err) => {
                if matches!(err, ClinicError::InvalidTransition(_)) {
                    tracing::warn!(
                        encounter_id,
                        user_id = actor.user_id,
                        transition = name,
                        reason = %err,
                        "transition refused"
                    );
                }
                Err(err)
            }
        }
    }
}
