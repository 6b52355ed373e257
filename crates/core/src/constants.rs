//! Constants used throughout the MedAssist core crate.
//!
//! Client-visible messages live here so the UI copy and the tests assert against a single
//! spelling.

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "medassist.db";

/// Default time a connection waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Maximum length for short free-text columns (names, labels, codes, addresses).
pub const MAX_SHORT_TEXT_LEN: usize = 255;

/// Rejection for `start()` outside `INITIALIZED`.
pub const MSG_ALREADY_STARTED: &str = "Consultation already started";

/// Rejection for `end()` / `cancel()` outside `IN_PROGRESS`.
pub const MSG_NOT_IN_PROGRESS: &str =
    "Consultation not started, already ended, or already cancelled";

/// Rejection for an observation on an encounter that is not in progress.
pub const MSG_OBSERVATION_NOT_ALLOWED: &str =
    "Observations can only be recorded while the consultation is in progress";

/// Rejection for a diagnosis on an encounter that is not in progress.
pub const MSG_DIAGNOSIS_NOT_ALLOWED: &str =
    "Diagnoses can only be recorded while the consultation is in progress";

/// Treatment gating: the encounter is not in progress.
pub const MSG_TREATMENT_NOT_IN_PROGRESS: &str =
    "Treatment cannot be created yet: the consultation is not in progress";

/// Treatment gating: no observation recorded yet.
pub const MSG_TREATMENT_NEEDS_OBSERVATION: &str =
    "Treatment cannot be created yet: record at least one observation first";

/// Treatment gating: no diagnosis recorded yet.
pub const MSG_TREATMENT_NEEDS_DIAGNOSIS: &str =
    "Treatment cannot be created yet: record at least one diagnosis first";

pub const MSG_UNAUTHORIZED_ACTION: &str = "This action is unauthorized.";
pub const MSG_UNAUTHENTICATED: &str = "Unauthenticated.";
pub const MSG_ACCOUNT_CLOSED: &str = "Your account has been closed.";
pub const MSG_BOOTSTRAP_REFUSED: &str = "An administrator account already exists.";
