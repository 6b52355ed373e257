//! # MedAssist Core
//!
//! Core business logic for the MedAssist clinic record system:
//! - the encounter lifecycle (`INITIALIZED` → `IN_PROGRESS` → `COMPLETED` / `CANCELED`)
//! - gating of observations, diagnoses and treatments on the encounter's state
//! - the patient and user directories
//! - SQLite persistence with transactional, status-guarded writes
//!
//! **No API concerns**: HTTP servers, request parsing and authentication belong in `api-rest`
//! and `api-shared`. Every operation here takes the acting user as an explicit [`Actor`].

pub mod authorization;
pub mod config;
pub mod constants;
pub mod error;
pub mod gating;
pub mod lifecycle;
pub mod models;
pub mod repositories;
pub mod store;
pub mod validation;

pub use authorization::{has_role, Actor, ADMIN_ROLES, CLINICAL_ROLES};
pub use config::CoreConfig;
pub use error::{ClinicError, ClinicResult};
pub use repositories::clinical_records::ClinicalRecordService;
pub use repositories::encounters::EncounterService;
pub use repositories::patients::PatientService;
pub use repositories::users::UserService;
pub use store::{MemoryStore, SqliteStore, Store, StoreTx};
