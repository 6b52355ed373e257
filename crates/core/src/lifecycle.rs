//! Encounter lifecycle engine.
//!
//! ```text
//! INITIALIZED --start()--------> IN_PROGRESS
//! IN_PROGRESS --end(summary)---> COMPLETED   (terminal)
//! IN_PROGRESS --cancel()-------> CANCELED    (terminal)
//! ```
//!
//! [`plan_transition`] is pure: it takes the current snapshot of an encounter and returns the next
//! snapshot together with an [`EncounterUpdate`] command. Applying the command is the store's job
//! (see [`crate::store::StoreTx::apply_encounter_update`]), inside the same transaction that read
//! the snapshot.
//!
//! There is no edge from `INITIALIZED` to `CANCELED` or `COMPLETED`.

use crate::constants::{MSG_ALREADY_STARTED, MSG_NOT_IN_PROGRESS};
use crate::models::{Encounter, EncounterId};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use medassist_types::{EncounterStatus, NonEmptyText};

/// A requested state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Start,
    End { summary: NonEmptyText },
    Cancel,
}

impl Transition {
    /// Short lowercase label used in log lines and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End { .. } => "end",
            Self::Cancel => "cancel",
        }
    }

    /// The only status this transition may leave from.
    pub fn source(&self) -> EncounterStatus {
        match self {
            Self::Start => EncounterStatus::Initialized,
            Self::End { .. } | Self::Cancel => EncounterStatus::InProgress,
        }
    }

    /// The status an encounter holds once this transition commits.
    pub fn target(&self) -> EncounterStatus {
        match self {
            Self::Start => EncounterStatus::InProgress,
            Self::End { .. } => EncounterStatus::Completed,
            Self::Cancel => EncounterStatus::Canceled,
        }
    }

    fn rejection(&self) -> &'static str {
        match self {
            Self::Start => MSG_ALREADY_STARTED,
            Self::End { .. } | Self::Cancel => MSG_NOT_IN_PROGRESS,
        }
    }

    /// The error reported when this transition is attempted from the wrong status.
    pub fn rejected(&self) -> ClinicError {
        ClinicError::invalid_transition(self.rejection())
    }
}

/// Persistence command for one lifecycle transition.
///
/// Carries every lifecycle-owned column plus the status the encounter must still have when the
/// write lands. A store applies it only if the row's status equals `expected_status`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncounterUpdate {
    pub encounter_id: EncounterId,
    pub expected_status: EncounterStatus,
    pub status: EncounterStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

impl EncounterUpdate {
    /// Writes the command's lifecycle columns onto a snapshot.
    pub fn apply_to(&self, encounter: &mut Encounter) {
        encounter.status = self.status;
        encounter.started_at = self.started_at;
        encounter.ended_at = self.ended_at;
        encounter.summary = self.summary.clone();
    }
}

/// Outcome of a successful [`plan_transition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    pub encounter: Encounter,
    pub update: EncounterUpdate,
}

/// Status reached by applying `transition` in `from`, if the edge exists.
pub fn next_status(from: EncounterStatus, transition: &Transition) -> Option<EncounterStatus> {
    (from == transition.source()).then(|| transition.target())
}

/// Validates `transition` against `current` and computes its full effect.
///
/// # Errors
///
/// Returns `ClinicError::InvalidTransition` when `current.status` is not the transition's source
/// status. `current` is never modified.
pub fn plan_transition(
    current: &Encounter,
    transition: Transition,
    now: DateTime<Utc>,
) -> ClinicResult<TransitionPlan> {
    if next_status(current.status, &transition).is_none() {
        return Err(transition.rejected());
    }

    let update = match transition {
        Transition::Start => EncounterUpdate {
            encounter_id: current.id,
            expected_status: current.status,
            status: EncounterStatus::InProgress,
            started_at: Some(now),
            ended_at: None,
            summary: None,
        },
        Transition::End { summary } => EncounterUpdate {
            encounter_id: current.id,
            expected_status: current.status,
            status: EncounterStatus::Completed,
            started_at: current.started_at,
            ended_at: Some(now),
            summary: Some(summary.into_inner()),
        },
        Transition::Cancel => EncounterUpdate {
            encounter_id: current.id,
            expected_status: current.status,
            status: EncounterStatus::Canceled,
            started_at: current.started_at,
            ended_at: Some(now),
            summary: None,
        },
    };

    let mut encounter = current.clone();
    update.apply_to(&mut encounter);
    debug_assert!(lifecycle_fields_consistent(&encounter));

    Ok(TransitionPlan { encounter, update })
}

/// Checks the column invariants tied to `status`:
/// `started_at` is set iff the consultation has started, `ended_at` iff it reached a terminal
/// status, and `summary` only once completed.
pub fn lifecycle_fields_consistent(encounter: &Encounter) -> bool {
    let started = encounter.status != EncounterStatus::Initialized;
    let ended = encounter.status.is_terminal();
    let completed = encounter.status == EncounterStatus::Completed;

    encounter.started_at.is_some() == started
        && encounter.ended_at.is_some() == ended
        && encounter.summary.is_some() == completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 6, 9, minute, 0).unwrap()
    }

    fn fresh() -> Encounter {
        Encounter {
            id: 11,
            patient_id: 2,
            user_id: 3,
            status: EncounterStatus::Initialized,
            started_at: None,
            ended_at: None,
            summary: None,
            created_at: at(0),
        }
    }

    fn summary(text: &str) -> NonEmptyText {
        NonEmptyText::new(text).unwrap()
    }

    fn all_transitions() -> Vec<Transition> {
        vec![
            Transition::Start,
            Transition::End {
                summary: summary("done"),
            },
            Transition::Cancel,
        ]
    }

    fn in_status(status: EncounterStatus) -> Encounter {
        let mut e = fresh();
        match status {
            EncounterStatus::Initialized => {}
            EncounterStatus::InProgress => {
                e = plan_transition(&e, Transition::Start, at(1)).unwrap().encounter;
            }
            EncounterStatus::Completed => {
                e = plan_transition(&e, Transition::Start, at(1)).unwrap().encounter;
                e = plan_transition(&e, Transition::End { summary: summary("ok") }, at(2))
                    .unwrap()
                    .encounter;
            }
            EncounterStatus::Canceled => {
                e = plan_transition(&e, Transition::Start, at(1)).unwrap().encounter;
                e = plan_transition(&e, Transition::Cancel, at(2)).unwrap().encounter;
            }
        }
        e
    }

    #[test]
    fn test_transition_labels_and_targets() {
        let expected = [
            ("start", EncounterStatus::Initialized, EncounterStatus::InProgress),
            ("end", EncounterStatus::InProgress, EncounterStatus::Completed),
            ("cancel", EncounterStatus::InProgress, EncounterStatus::Canceled),
        ];
        for (transition, (name, source, target)) in all_transitions().iter().zip(expected) {
            assert_eq!(transition.name(), name);
            assert_eq!(transition.source(), source);
            assert_eq!(transition.target(), target);
            assert_eq!(next_status(source, transition), Some(target));
        }
    }

    #[test]
    fn test_fresh_encounter_is_consistent() {
        assert!(lifecycle_fields_consistent(&fresh()));
    }

    #[test]
    fn test_start_sets_started_at_only() {
        let plan = plan_transition(&fresh(), Transition::Start, at(5)).unwrap();
        assert_eq!(plan.encounter.status, EncounterStatus::InProgress);
        assert_eq!(plan.encounter.started_at, Some(at(5)));
        assert_eq!(plan.encounter.ended_at, None);
        assert_eq!(plan.encounter.summary, None);
        assert_eq!(plan.update.expected_status, EncounterStatus::Initialized);
        assert_eq!(plan.update.encounter_id, 11);
    }

    #[test]
    fn test_end_records_summary_and_keeps_start_time() {
        let started = in_status(EncounterStatus::InProgress);
        let plan = plan_transition(
            &started,
            Transition::End {
                summary: summary("Patient recovered"),
            },
            at(30),
        )
        .unwrap();
        assert_eq!(plan.encounter.status, EncounterStatus::Completed);
        assert_eq!(plan.encounter.started_at, Some(at(1)));
        assert_eq!(plan.encounter.ended_at, Some(at(30)));
        assert_eq!(plan.encounter.summary.as_deref(), Some("Patient recovered"));
        assert_eq!(plan.update.expected_status, EncounterStatus::InProgress);
    }

    #[test]
    fn test_cancel_sets_ended_at_without_summary() {
        let plan = plan_transition(
            &in_status(EncounterStatus::InProgress),
            Transition::Cancel,
            at(9),
        )
        .unwrap();
        assert_eq!(plan.encounter.status, EncounterStatus::Canceled);
        assert_eq!(plan.encounter.ended_at, Some(at(9)));
        assert_eq!(plan.encounter.summary, None);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let started = in_status(EncounterStatus::InProgress);
        let err = plan_transition(&started, Transition::Start, at(7)).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidTransition(ref m) if m == MSG_ALREADY_STARTED));
    }

    #[test]
    fn test_cannot_cancel_or_end_before_start() {
        let err = plan_transition(&fresh(), Transition::Cancel, at(1)).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidTransition(ref m) if m == MSG_NOT_IN_PROGRESS));
        let err = plan_transition(
            &fresh(),
            Transition::End {
                summary: summary("x"),
            },
            at(1),
        )
        .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidTransition(_)));
    }

    #[test]
    fn test_edge_table_is_exhaustive() {
        for status in EncounterStatus::ALL {
            for transition in all_transitions() {
                let before = in_status(*status);
                let result = plan_transition(&before, transition.clone(), at(40));
                let allowed = matches!(
                    (status, &transition),
                    (EncounterStatus::Initialized, Transition::Start)
                        | (EncounterStatus::InProgress, Transition::End { .. })
                        | (EncounterStatus::InProgress, Transition::Cancel)
                );
                assert_eq!(
                    result.is_ok(),
                    allowed,
                    "{status} --{}--> should be {}",
                    transition.name(),
                    if allowed { "allowed" } else { "refused" }
                );
                match result {
                    Ok(plan) => {
                        assert_eq!(plan.encounter.status, transition.target());
                        assert!(lifecycle_fields_consistent(&plan.encounter));
                    }
                    Err(err) => assert!(matches!(err, ClinicError::InvalidTransition(_))),
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in [EncounterStatus::Completed, EncounterStatus::Canceled] {
            for transition in all_transitions() {
                assert_eq!(next_status(status, &transition), None);
            }
        }
    }

    #[test]
    fn test_inconsistent_snapshots_are_detected() {
        let mut e = fresh();
        e.started_at = Some(at(1));
        assert!(!lifecycle_fields_consistent(&e));

        let mut e = in_status(EncounterStatus::Canceled);
        e.summary = Some("should not be here".into());
        assert!(!lifecycle_fields_consistent(&e));
    }
}
