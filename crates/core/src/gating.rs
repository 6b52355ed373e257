//! Clinical record gating.
//!
//! Decides whether a child record may be attached to an encounter given the encounter's current
//! status and what has already been recorded. Observations and diagnoses need a consultation in
//! progress; a treatment additionally needs at least one observation and one diagnosis.

use crate::constants::{
    MSG_DIAGNOSIS_NOT_ALLOWED, MSG_OBSERVATION_NOT_ALLOWED, MSG_TREATMENT_NEEDS_DIAGNOSIS,
    MSG_TREATMENT_NEEDS_OBSERVATION, MSG_TREATMENT_NOT_IN_PROGRESS,
};
use crate::models::ChildCounts;
use crate::{ClinicError, ClinicResult};
use medassist_types::EncounterStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildRecordKind {
    Observation,
    Diagnosis,
    Treatment,
}

impl ChildRecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::Diagnosis => "diagnosis",
            Self::Treatment => "treatment",
        }
    }
}

/// Returns the first failed precondition for attaching `kind`, if any.
pub fn refusal(
    kind: ChildRecordKind,
    status: EncounterStatus,
    counts: ChildCounts,
) -> Option<&'static str> {
    let in_progress = status == EncounterStatus::InProgress;
    match kind {
        ChildRecordKind::Observation if !in_progress => Some(MSG_OBSERVATION_NOT_ALLOWED),
        ChildRecordKind::Diagnosis if !in_progress => Some(MSG_DIAGNOSIS_NOT_ALLOWED),
        ChildRecordKind::Treatment if !in_progress => Some(MSG_TREATMENT_NOT_IN_PROGRESS),
        ChildRecordKind::Treatment if counts.observations == 0 => {
            Some(MSG_TREATMENT_NEEDS_OBSERVATION)
        }
        ChildRecordKind::Treatment if counts.diagnoses == 0 => Some(MSG_TREATMENT_NEEDS_DIAGNOSIS),
        _ => None,
    }
}

/// [`refusal`] as a guard.
///
/// # Errors
///
/// Returns `ClinicError::InvalidTransition` naming the failed precondition.
pub fn check_child_creation(
    kind: ChildRecordKind,
    status: EncounterStatus,
    counts: ChildCounts,
) -> ClinicResult<()> {
    match refusal(kind, status, counts) {
        None => Ok(()),
        Some(message) => Err(ClinicError::invalid_transition(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(observations: u32, diagnoses: u32) -> ChildCounts {
        ChildCounts {
            observations,
            diagnoses,
            treatments: 0,
        }
    }

    #[test]
    fn test_observation_and_diagnosis_need_in_progress_only() {
        for kind in [ChildRecordKind::Observation, ChildRecordKind::Diagnosis] {
            for status in EncounterStatus::ALL {
                let allowed = check_child_creation(kind, *status, counts(0, 0)).is_ok();
                assert_eq!(allowed, *status == EncounterStatus::InProgress, "{kind:?} in {status}");
            }
        }
    }

    #[test]
    fn test_treatment_iff_in_progress_with_observation_and_diagnosis() {
        for status in EncounterStatus::ALL {
            for observations in 0..=2 {
                for diagnoses in 0..=2 {
                    let result = check_child_creation(
                        ChildRecordKind::Treatment,
                        *status,
                        counts(observations, diagnoses),
                    );
                    let expected = *status == EncounterStatus::InProgress
                        && observations >= 1
                        && diagnoses >= 1;
                    assert_eq!(result.is_ok(), expected);
                    if let Err(err) = result {
                        assert!(matches!(err, ClinicError::InvalidTransition(_)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_treatment_refusal_names_the_missing_clause() {
        assert_eq!(
            refusal(ChildRecordKind::Treatment, EncounterStatus::Completed, counts(3, 3)),
            Some(MSG_TREATMENT_NOT_IN_PROGRESS)
        );
        assert_eq!(
            refusal(ChildRecordKind::Treatment, EncounterStatus::InProgress, counts(0, 1)),
            Some(MSG_TREATMENT_NEEDS_OBSERVATION)
        );
        assert_eq!(
            refusal(ChildRecordKind::Treatment, EncounterStatus::InProgress, counts(1, 0)),
            Some(MSG_TREATMENT_NEEDS_DIAGNOSIS)
        );
    }
}
