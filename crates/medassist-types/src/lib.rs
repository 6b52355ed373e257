//! # MedAssist Types
//!
//! Vocabulary shared by every MedAssist crate:
//! - enumerations whose literal strings are both the database representation and the JSON wire
//!   representation (`EncounterStatus`, `ObservationType`, `TreatmentType`, `Role`, `Gender`)
//! - validated text ([`NonEmptyText`])
//! - field-keyed validation failures ([`ValidationErrors`])

mod enums;
mod text;
mod validation;

pub use enums::{EncounterStatus, Gender, ObservationType, Role, TreatmentType, UnknownVariant};
pub use text::{NonEmptyText, TextError};
pub use validation::ValidationErrors;
