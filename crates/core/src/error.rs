use medassist_types::ValidationErrors;

/// Every failure a core operation can report.
///
/// The first five variants are client errors with stable messages; the API boundary maps each to
/// a fixed status code. The rest are unexpected failures.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: i64 },
    /// A lifecycle transition or a gating precondition was refused.
    #[error("{0}")]
    InvalidTransition(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthenticated(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid stored value for {field}: {value}")]
    InvalidStoredValue { field: &'static str, value: String },
    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("store lock poisoned")]
    StorePoisoned,
}

impl ClinicError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition(message.into())
    }

    /// `true` for errors caused by the caller rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidTransition(_)
                | Self::Validation(_)
                | Self::Forbidden(_)
                | Self::Unauthenticated(_)
        )
    }
}

impl From<ValidationErrors> for ClinicError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
