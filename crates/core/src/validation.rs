//! Input validation.
//!
//! Raw inputs arrive with every field optional, the way a JSON body might. Each `validate_*`
//! function either produces the corresponding validated `New*` value or a [`ValidationErrors`]
//! listing every failing field at once.

use crate::constants::MAX_SHORT_TEXT_LEN;
use crate::models::{NewDiagnosis, NewObservation, NewTreatment, NewUser, PatientFields};
use chrono::NaiveDate;
use medassist_types::{NonEmptyText, TextError, UnknownVariant, ValidationErrors};
use std::str::FromStr;

#[derive(Clone, Debug, Default)]
pub struct ObservationInput {
    pub observation_type: Option<String>,
    pub value: Option<String>,
    pub unit: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct DiagnosisInput {
    pub code: Option<String>,
    pub label: Option<String>,
    pub is_primary: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct TreatmentInput {
    pub treatment_type: Option<String>,
    pub description: Option<String>,
    pub dosage: Option<String>,
    pub duration: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PatientInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

pub(crate) fn required_message(field: &str) -> String {
    format!("The {} field is required.", label(field))
}

pub(crate) fn taken_message(field: &str) -> String {
    format!("The {} has already been taken.", label(field))
}

fn text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: Option<usize>,
) -> Option<NonEmptyText> {
    let raw = value.unwrap_or_default();
    let parsed = match max {
        Some(max) => NonEmptyText::bounded(raw, max),
        None => NonEmptyText::new(raw),
    };
    match parsed {
        Ok(text) => Some(text),
        Err(TextError::Empty) => {
            errors.add(field, required_message(field));
            None
        }
        Err(TextError::TooLong { max }) => {
            errors.add(
                field,
                format!(
                    "The {} field must not be greater than {max} characters.",
                    label(field)
                ),
            );
            None
        }
    }
}

fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: Option<usize>,
) -> Option<NonEmptyText> {
    match value.map(str::trim) {
        None | Some("") => None,
        Some(present) => text(errors, field, Some(present), max),
    }
}

fn literal<T>(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> Option<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    match value.map(str::trim) {
        None | Some("") => {
            errors.add(field, required_message(field));
            None
        }
        Some(raw) => match raw.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                errors.add(field, format!("The selected {} is invalid.", label(field)));
                None
            }
        },
    }
}

/// Local mobile number: `07` followed by eight digits.
fn is_mobile_number(value: &str) -> bool {
    value.len() == 10 && value.starts_with("07") && value.bytes().all(|b| b.is_ascii_digit())
}

fn mobile(errors: &mut ValidationErrors, field: &str, value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, required_message(field));
        return None;
    }
    if !is_mobile_number(value) {
        errors.add(field, format!("The {} field format is invalid.", label(field)));
        return None;
    }
    Some(value.to_string())
}

/// The `summary` required to end a consultation.
pub fn validate_summary(summary: Option<&str>) -> Result<NonEmptyText, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let summary = text(&mut errors, "summary", summary, None);
    match summary {
        Some(summary) => Ok(summary),
        None => Err(errors),
    }
}

pub fn validate_patient_reference(patient_id: Option<i64>) -> Result<i64, ValidationErrors> {
    patient_id.ok_or_else(|| ValidationErrors::single("patient_id", required_message("patient_id")))
}

pub fn validate_observation(input: &ObservationInput) -> Result<NewObservation, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let observation_type = literal(&mut errors, "type", input.observation_type.as_deref());
    let value = text(&mut errors, "value", input.value.as_deref(), Some(MAX_SHORT_TEXT_LEN));
    let unit = text(&mut errors, "unit", input.unit.as_deref(), Some(MAX_SHORT_TEXT_LEN));

    match (observation_type, value, unit) {
        (Some(observation_type), Some(value), Some(unit)) => Ok(NewObservation {
            observation_type,
            value,
            unit,
        }),
        _ => Err(errors),
    }
}

pub fn validate_diagnosis(input: &DiagnosisInput) -> Result<NewDiagnosis, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let code = optional_text(&mut errors, "code", input.code.as_deref(), Some(MAX_SHORT_TEXT_LEN));
    let label = text(&mut errors, "label", input.label.as_deref(), Some(MAX_SHORT_TEXT_LEN));
    if input.is_primary.is_none() {
        errors.add("is_primary", required_message("is_primary"));
    }

    match (label, input.is_primary) {
        (Some(label), Some(is_primary)) if errors.is_empty() => Ok(NewDiagnosis {
            code,
            label,
            is_primary,
        }),
        _ => Err(errors),
    }
}

pub fn validate_treatment(input: &TreatmentInput) -> Result<NewTreatment, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let treatment_type = literal(&mut errors, "type", input.treatment_type.as_deref());
    let description = text(&mut errors, "description", input.description.as_deref(), None);
    let dosage = text(&mut errors, "dosage", input.dosage.as_deref(), Some(MAX_SHORT_TEXT_LEN));
    let notes = optional_text(&mut errors, "notes", input.notes.as_deref(), None);
    let duration = match input.duration {
        None => {
            errors.add("duration", required_message("duration"));
            None
        }
        Some(days) if days < 1 => {
            errors.add("duration", "The duration field must be at least 1.");
            None
        }
        Some(days) => match u32::try_from(days) {
            Ok(days) => Some(days),
            Err(_) => {
                errors.add("duration", "The duration field is too large.");
                None
            }
        },
    };

    match (treatment_type, description, dosage, duration) {
        (Some(treatment_type), Some(description), Some(dosage), Some(duration))
            if errors.is_empty() =>
        {
            Ok(NewTreatment {
                treatment_type,
                description,
                dosage,
                duration,
                notes,
            })
        }
        _ => Err(errors),
    }
}

/// Validates the shape of patient attributes. Uniqueness of `phone` and `national_id` needs the
/// store and is checked by the patient service.
pub fn validate_patient(input: &PatientInput) -> Result<PatientFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let max = Some(MAX_SHORT_TEXT_LEN);
    let first_name = text(&mut errors, "first_name", input.first_name.as_deref(), max);
    let last_name = text(&mut errors, "last_name", input.last_name.as_deref(), max);
    let gender = literal(&mut errors, "gender", input.gender.as_deref());
    let date_of_birth = match input.date_of_birth.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("date_of_birth", required_message("date_of_birth"));
            None
        }
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.add(
                    "date_of_birth",
                    "The date of birth field must be a valid date.",
                );
                None
            }
        },
    };
    let phone = mobile(&mut errors, "phone", input.phone.as_deref());
    let national_id = match input.national_id.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("national_id", required_message("national_id"));
            None
        }
        Some(raw) if raw.len() == 16 && raw.bytes().all(|b| b.is_ascii_digit()) => {
            Some(raw.to_string())
        }
        Some(_) => {
            errors.add("national_id", "The national id field must be 16 digits.");
            None
        }
    };
    let address = text(&mut errors, "address", input.address.as_deref(), max);
    let emergency_contact_name = text(
        &mut errors,
        "emergency_contact_name",
        input.emergency_contact_name.as_deref(),
        max,
    );
    let emergency_contact_phone = mobile(
        &mut errors,
        "emergency_contact_phone",
        input.emergency_contact_phone.as_deref(),
    );

    match (
        first_name,
        last_name,
        gender,
        date_of_birth,
        phone,
        national_id,
        address,
        emergency_contact_name,
        emergency_contact_phone,
    ) {
        (
            Some(first_name),
            Some(last_name),
            Some(gender),
            Some(date_of_birth),
            Some(phone),
            Some(national_id),
            Some(address),
            Some(emergency_contact_name),
            Some(emergency_contact_phone),
        ) => Ok(PatientFields {
            first_name,
            last_name,
            gender,
            date_of_birth,
            phone,
            national_id,
            address,
            emergency_contact_name,
            emergency_contact_phone,
        }),
        _ => Err(errors),
    }
}

pub fn validate_user(input: &UserInput) -> Result<NewUser, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = text(&mut errors, "name", input.name.as_deref(), Some(MAX_SHORT_TEXT_LEN));
    let email = match input.email.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("email", required_message("email"));
            None
        }
        Some(raw) if looks_like_email(raw) => Some(raw.to_lowercase()),
        Some(_) => {
            errors.add("email", "The email field must be a valid email address.");
            None
        }
    };
    let role = literal(&mut errors, "role", input.role.as_deref());

    match (name, email, role) {
        (Some(name), Some(email), Some(role)) => Ok(NewUser { name, email, role }),
        _ => Err(errors),
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
