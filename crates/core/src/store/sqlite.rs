use super::{normalise_search, Store, StoreTx};
use crate::config::CoreConfig;
use crate::constants::DEFAULT_BUSY_TIMEOUT_MS;
use crate::lifecycle::EncounterUpdate;
use crate::models::{
    ChildCounts, Diagnosis, Encounter, EncounterFilter, EncounterId, NewDiagnosis, NewEncounter,
    NewObservation, NewTreatment, NewUser, Observation, Patient, PatientConflicts, PatientFields,
    PatientId, Treatment, User, UserId,
};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use medassist_types::{EncounterStatus, UnknownVariant};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

const ENCOUNTER_COLUMNS: &str =
    "id, patient_id, user_id, status, started_at, ended_at, summary, created_at";
const PATIENT_COLUMNS: &str = "id, first_name, last_name, gender, date_of_birth, phone, \
     national_id, address, emergency_contact_name, emergency_contact_phone, created_at";
const USER_COLUMNS: &str = "id, name, email, role, is_active, last_login_at";

/// Production store backed by a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database named by `config` and brings its schema up to
    /// date.
    pub fn open(config: &CoreConfig) -> ClinicResult<Self> {
        let conn = open_connection(config.database_path(), config.busy_timeout())?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Fresh private in-memory database, migrated.
    pub fn open_in_memory() -> ClinicResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure_pragmas(&conn, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` against the raw connection outside any transaction.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> ClinicResult<T>,
    ) -> ClinicResult<T> {
        let conn = self.conn.lock().map_err(|_| ClinicError::StorePoisoned)?;
        f(&conn)
    }
}

impl Store for SqliteStore {
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut dyn StoreTx) -> ClinicResult<T>,
    ) -> ClinicResult<T> {
        let mut conn = self.conn.lock().map_err(|_| ClinicError::StorePoisoned)?;
        // IMMEDIATE takes the write lock up front, so a status read inside `f` cannot go stale
        // before the guarded update lands.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&mut SqliteTx { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }
}

/// Opens a connection and applies the session pragmas. Does not migrate.
pub fn open_connection(path: &Path, busy_timeout: Duration) -> ClinicResult<Connection> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn, busy_timeout)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection, busy_timeout: Duration) -> ClinicResult<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(())
}

const MIGRATIONS: [(i64, &str); 1] = [(1, include_str!("../../migrations/001_initial.sql"))];

/// Applies every migration newer than the recorded schema version.
///
/// # Errors
///
/// - `ClinicError::Database` if the schema version cannot be read (for example the database is
///   locked by another process).
/// - `ClinicError::MigrationFailed` if a migration script fails. That migration is rolled back.
pub fn run_migrations(conn: &Connection) -> ClinicResult<()> {
    apply_migrations(conn, &MIGRATIONS)
}

fn apply_migrations(conn: &Connection, migrations: &[(i64, &str)]) -> ClinicResult<()> {
    for &(version, sql) in migrations {
        // One IMMEDIATE transaction per migration: concurrent starters serialise on the write
        // lock and re-read the version once they hold it.
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        if version <= get_current_version(&tx)? {
            continue;
        }
        tracing::info!(version, "running migration");
        tx.execute_batch(sql)
            .map_err(|e| ClinicError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        tx.commit()?;
    }

    Ok(())
}

/// 0 when no schema exists yet. Any other read failure is returned.
fn get_current_version(conn: &Connection) -> ClinicResult<i64> {
    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(0);
    }
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// Number of user tables, excluding SQLite's own.
pub fn count_tables(conn: &Connection) -> ClinicResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

struct SqliteTx<'c> {
    conn: &'c Connection,
}

fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn count_column(field: &'static str, raw: i64) -> ClinicResult<u32> {
    u32::try_from(raw).map_err(|_| ClinicError::InvalidStoredValue {
        field,
        value: raw.to_string(),
    })
}

fn encounter_from_row(row: &Row<'_>) -> rusqlite::Result<Encounter> {
    Ok(Encounter {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        user_id: row.get(2)?,
        status: enum_column(row, 3)?,
        started_at: row.get(4)?,
        ended_at: row.get(5)?,
        summary: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        gender: enum_column(row, 3)?,
        date_of_birth: row.get(4)?,
        phone: row.get(5)?,
        national_id: row.get(6)?,
        address: row.get(7)?,
        emergency_contact_name: row.get(8)?,
        emergency_contact_phone: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: enum_column(row, 3)?,
        is_active: row.get(4)?,
        last_login_at: row.get(5)?,
    })
}

/// `%term%` with LIKE wildcards in the term escaped by `\`.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl SqliteTx<'_> {
    fn collect<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> ClinicResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }
}

impl StoreTx for SqliteTx<'_> {
    fn insert_encounter(
        &mut self,
        new: &NewEncounter,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Encounter> {
        self.conn.execute(
            "INSERT INTO encounters (patient_id, user_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new.patient_id,
                new.user_id,
                EncounterStatus::Initialized.as_str(),
                created_at
            ],
        )?;
        Ok(Encounter {
            id: self.conn.last_insert_rowid(),
            patient_id: new.patient_id,
            user_id: new.user_id,
            status: EncounterStatus::Initialized,
            started_at: None,
            ended_at: None,
            summary: None,
            created_at,
        })
    }

    fn find_encounter(&mut self, id: EncounterId) -> ClinicResult<Option<Encounter>> {
        let sql = format!("SELECT {ENCOUNTER_COLUMNS} FROM encounters WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], encounter_from_row)
            .optional()?)
    }

    fn list_encounters(&mut self, filter: &EncounterFilter) -> ClinicResult<Vec<Encounter>> {
        let sql = format!(
            "SELECT {ENCOUNTER_COLUMNS} FROM encounters
             WHERE (?1 IS NULL OR patient_id = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY started_at IS NULL, started_at DESC, id DESC"
        );
        self.collect(
            &sql,
            params![filter.patient_id, filter.status.map(|s| s.as_str())],
            encounter_from_row,
        )
    }

    fn apply_encounter_update(&mut self, update: &EncounterUpdate) -> ClinicResult<bool> {
        let changed = self.conn.execute(
            "UPDATE encounters SET status = ?1, started_at = ?2, ended_at = ?3, summary = ?4
             WHERE id = ?5 AND status = ?6",
            params![
                update.status.as_str(),
                update.started_at,
                update.ended_at,
                update.summary,
                update.encounter_id,
                update.expected_status.as_str()
            ],
        )?;
        Ok(changed == 1)
    }

    fn child_counts(&mut self, encounter_id: EncounterId) -> ClinicResult<ChildCounts> {
        let (observations, diagnoses, treatments) = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM observations WHERE encounter_id = ?1),
                (SELECT COUNT(*) FROM diagnoses WHERE encounter_id = ?1),
                (SELECT COUNT(*) FROM treatments WHERE encounter_id = ?1)",
            params![encounter_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
        )?;
        Ok(ChildCounts {
            observations: count_column("observations_count", observations)?,
            diagnoses: count_column("diagnoses_count", diagnoses)?,
            treatments: count_column("treatments_count", treatments)?,
        })
    }

    fn insert_observation(
        &mut self,
        encounter_id: EncounterId,
        new: &NewObservation,
        recorded_at: DateTime<Utc>,
    ) -> ClinicResult<Observation> {
        self.conn.execute(
            "INSERT INTO observations (encounter_id, type, value, unit, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                encounter_id,
                new.observation_type.as_str(),
                new.value.as_str(),
                new.unit.as_str(),
                recorded_at
            ],
        )?;
        Ok(Observation {
            id: self.conn.last_insert_rowid(),
            encounter_id,
            observation_type: new.observation_type,
            value: new.value.to_string(),
            unit: new.unit.to_string(),
            recorded_at,
        })
    }

    fn list_observations(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Observation>> {
        self.collect(
            "SELECT id, encounter_id, type, value, unit, recorded_at FROM observations
             WHERE encounter_id = ?1 ORDER BY recorded_at DESC, id DESC",
            params![encounter_id],
            |row| {
                Ok(Observation {
                    id: row.get(0)?,
                    encounter_id: row.get(1)?,
                    observation_type: enum_column(row, 2)?,
                    value: row.get(3)?,
                    unit: row.get(4)?,
                    recorded_at: row.get(5)?,
                })
            },
        )
    }

    fn demote_primary_diagnoses(&mut self, encounter_id: EncounterId) -> ClinicResult<usize> {
        Ok(self.conn.execute(
            "UPDATE diagnoses SET is_primary = 0 WHERE encounter_id = ?1 AND is_primary = 1",
            params![encounter_id],
        )?)
    }

    fn insert_diagnosis(
        &mut self,
        encounter_id: EncounterId,
        new: &NewDiagnosis,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Diagnosis> {
        self.conn.execute(
            "INSERT INTO diagnoses (encounter_id, code, label, is_primary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                encounter_id,
                new.code.as_ref().map(|c| c.as_str()),
                new.label.as_str(),
                new.is_primary,
                created_at
            ],
        )?;
        Ok(Diagnosis {
            id: self.conn.last_insert_rowid(),
            encounter_id,
            code: new.code.as_ref().map(ToString::to_string),
            label: new.label.to_string(),
            is_primary: new.is_primary,
        })
    }

    fn list_diagnoses(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Diagnosis>> {
        self.collect(
            "SELECT id, encounter_id, code, label, is_primary FROM diagnoses
             WHERE encounter_id = ?1 ORDER BY is_primary DESC, id ASC",
            params![encounter_id],
            |row| {
                Ok(Diagnosis {
                    id: row.get(0)?,
                    encounter_id: row.get(1)?,
                    code: row.get(2)?,
                    label: row.get(3)?,
                    is_primary: row.get(4)?,
                })
            },
        )
    }

    fn insert_treatment(
        &mut self,
        encounter_id: EncounterId,
        new: &NewTreatment,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Treatment> {
        self.conn.execute(
            "INSERT INTO treatments
                (encounter_id, type, description, dosage, duration, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                encounter_id,
                new.treatment_type.as_str(),
                new.description.as_str(),
                new.dosage.as_str(),
                new.duration,
                new.notes.as_ref().map(|n| n.as_str()),
                created_at
            ],
        )?;
        Ok(Treatment {
            id: self.conn.last_insert_rowid(),
            encounter_id,
            treatment_type: new.treatment_type,
            description: new.description.to_string(),
            dosage: new.dosage.to_string(),
            duration: new.duration,
            notes: new.notes.as_ref().map(ToString::to_string),
            created_at,
        })
    }

    fn list_treatments(&mut self, encounter_id: EncounterId) -> ClinicResult<Vec<Treatment>> {
        self.collect(
            "SELECT id, encounter_id, type, description, dosage, duration, notes, created_at
             FROM treatments WHERE encounter_id = ?1 ORDER BY created_at DESC, id DESC",
            params![encounter_id],
            |row| {
                Ok(Treatment {
                    id: row.get(0)?,
                    encounter_id: row.get(1)?,
                    treatment_type: enum_column(row, 2)?,
                    description: row.get(3)?,
                    dosage: row.get(4)?,
                    duration: row.get(5)?,
                    notes: row.get(6)?,
                    created_at: row.get(7)?,
                })
            },
        )
    }

    fn insert_patient(
        &mut self,
        fields: &PatientFields,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Patient> {
        self.conn.execute(
            "INSERT INTO patients (first_name, last_name, gender, date_of_birth, phone,
                national_id, address, emergency_contact_name, emergency_contact_phone, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                fields.first_name.as_str(),
                fields.last_name.as_str(),
                fields.gender.as_str(),
                fields.date_of_birth,
                fields.phone,
                fields.national_id,
                fields.address.as_str(),
                fields.emergency_contact_name.as_str(),
                fields.emergency_contact_phone,
                created_at
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.find_patient(id)?
            .ok_or_else(|| ClinicError::not_found("Patient", id))
    }

    fn find_patient(&mut self, id: PatientId) -> ClinicResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], patient_from_row)
            .optional()?)
    }

    fn update_patient(&mut self, id: PatientId, fields: &PatientFields) -> ClinicResult<bool> {
        let changed = self.conn.execute(
            "UPDATE patients SET first_name = ?1, last_name = ?2, gender = ?3,
                date_of_birth = ?4, phone = ?5, national_id = ?6, address = ?7,
                emergency_contact_name = ?8, emergency_contact_phone = ?9
             WHERE id = ?10",
            params![
                fields.first_name.as_str(),
                fields.last_name.as_str(),
                fields.gender.as_str(),
                fields.date_of_birth,
                fields.phone,
                fields.national_id,
                fields.address.as_str(),
                fields.emergency_contact_name.as_str(),
                fields.emergency_contact_phone,
                id
            ],
        )?;
        Ok(changed == 1)
    }

    fn delete_patient_cascade(&mut self, id: PatientId) -> ClinicResult<bool> {
        const OWNED_BY_PATIENT: &str =
            "encounter_id IN (SELECT id FROM encounters WHERE patient_id = ?1)";
        for table in ["treatments", "diagnoses", "observations"] {
            self.conn.execute(
                &format!("DELETE FROM {table} WHERE {OWNED_BY_PATIENT}"),
                params![id],
            )?;
        }
        self.conn
            .execute("DELETE FROM encounters WHERE patient_id = ?1", params![id])?;
        let removed = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?1", params![id])?;
        Ok(removed == 1)
    }

    fn list_patients(&mut self, search: Option<&str>) -> ClinicResult<Vec<Patient>> {
        let pattern = normalise_search(search).map(|term| like_pattern(&term));
        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients
             WHERE ?1 IS NULL
                OR first_name LIKE ?1 ESCAPE '\\'
                OR last_name LIKE ?1 ESCAPE '\\'
                OR phone LIKE ?1 ESCAPE '\\'
                OR national_id LIKE ?1 ESCAPE '\\'
                OR address LIKE ?1 ESCAPE '\\'
                OR emergency_contact_name LIKE ?1 ESCAPE '\\'
                OR emergency_contact_phone LIKE ?1 ESCAPE '\\'
             ORDER BY id"
        );
        self.collect(&sql, params![pattern], patient_from_row)
    }

    fn patient_conflicts(
        &mut self,
        phone: &str,
        national_id: &str,
        exclude: Option<PatientId>,
    ) -> ClinicResult<PatientConflicts> {
        let (phone, national_id) = self.conn.query_row(
            "SELECT
                EXISTS(SELECT 1 FROM patients WHERE phone = ?1 AND (?3 IS NULL OR id <> ?3)),
                EXISTS(SELECT 1 FROM patients WHERE national_id = ?2 AND (?3 IS NULL OR id <> ?3))",
            params![phone, national_id, exclude],
            |row| Ok((row.get::<_, bool>(0)?, row.get::<_, bool>(1)?)),
        )?;
        Ok(PatientConflicts { phone, national_id })
    }

    fn insert_user(&mut self, new: &NewUser, created_at: DateTime<Utc>) -> ClinicResult<User> {
        self.conn.execute(
            "INSERT INTO users (name, email, role, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![new.name.as_str(), new.email, new.role.as_str(), created_at],
        )?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
            name: new.name.to_string(),
            email: new.email.clone(),
            role: new.role,
            is_active: true,
            last_login_at: None,
        })
    }

    fn find_user(&mut self, id: UserId) -> ClinicResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], user_from_row)
            .optional()?)
    }

    fn list_users(&mut self, search: Option<&str>) -> ClinicResult<Vec<User>> {
        let pattern = normalise_search(search).map(|term| like_pattern(&term));
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\'
             ORDER BY id"
        );
        self.collect(&sql, params![pattern], user_from_row)
    }

    fn user_email_taken(&mut self, email: &str) -> ClinicResult<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 COLLATE NOCASE)",
            params![email],
            |row| row.get::<_, bool>(0),
        )?)
    }

    fn count_users(&mut self) -> ClinicResult<u64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, i64>(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn set_user_active(&mut self, id: UserId, is_active: bool) -> ClinicResult<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET is_active = ?1 WHERE id = ?2",
            params![is_active, id],
        )?;
        Ok(changed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use medassist_types::{Gender, NonEmptyText, Role};

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn patient_fields(phone: &str, national_id: &str) -> PatientFields {
        PatientFields {
            first_name: text("Aline"),
            last_name: text("Uwase"),
            gender: Gender::Female,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            phone: phone.into(),
            national_id: national_id.into(),
            address: text("Kigali"),
            emergency_contact_name: text("Jean Uwase"),
            emergency_contact_phone: "0788000001".into(),
        }
    }

    fn seed_encounter(store: &SqliteStore) -> Encounter {
        store
            .transaction(|tx| {
                let patient =
                    tx.insert_patient(&patient_fields("0788123456", "1199080012345678"), Utc::now())?;
                let user = tx.insert_user(
                    &NewUser {
                        name: text("Dr. Mugisha"),
                        email: "mugisha@clinic.rw".into(),
                        role: Role::Doctor,
                    },
                    Utc::now(),
                )?;
                tx.insert_encounter(
                    &NewEncounter {
                        patient_id: patient.id,
                        user_id: user.id,
                    },
                    Utc::now(),
                )
            })
            .unwrap()
    }

    #[test]
    fn test_in_memory_database_initializes_tables() {
        let store = SqliteStore::open_in_memory().unwrap();
        let count = store.with_connection(count_tables).unwrap();
        // schema_version + users, patients, encounters, observations, diagnoses, treatments
        assert_eq!(count, 7);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.with_connection(run_migrations).unwrap();
        let version: i64 = store
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_failed_migration_leaves_no_partial_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let err = apply_migrations(
            &conn,
            &[(1, "CREATE TABLE half_done (id INTEGER); NOT VALID SQL;")],
        )
        .unwrap_err();
        assert!(matches!(err, ClinicError::MigrationFailed { version: 1, .. }));
        assert_eq!(count_tables(&conn).unwrap(), 0);

        run_migrations(&conn).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 7);
    }

    #[test]
    fn test_locked_database_is_not_mistaken_for_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let holder = open_connection(&path, Duration::from_millis(50)).unwrap();
        run_migrations(&holder).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let starter = open_connection(&path, Duration::from_millis(50)).unwrap();
        let err = run_migrations(&starter).unwrap_err();
        assert!(matches!(err, ClinicError::Database(_)), "{err:?}");

        holder.execute_batch("COMMIT").unwrap();
        run_migrations(&starter).unwrap();
        assert_eq!(count_tables(&starter).unwrap(), 7);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let store = SqliteStore::open_in_memory().unwrap();
        let fk: i64 = store
            .with_connection(|conn| {
                Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_file_backed_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::new(dir.path().join("clinic.db"), Duration::from_millis(500))
            .unwrap();

        let encounter_id = {
            let store = SqliteStore::open(&config).unwrap();
            seed_encounter(&store).id
        };

        let store = SqliteStore::open(&config).unwrap();
        let found = store
            .transaction(|tx| tx.find_encounter(encounter_id))
            .unwrap()
            .unwrap();
        assert_eq!(found.status, EncounterStatus::Initialized);
        assert!(found.started_at.is_none());
    }

    #[test]
    fn test_guarded_update_matches_expected_status_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let encounter = seed_encounter(&store);
        let now = Utc::now();
        let start = EncounterUpdate {
            encounter_id: encounter.id,
            expected_status: EncounterStatus::Initialized,
            status: EncounterStatus::InProgress,
            started_at: Some(now),
            ended_at: None,
            summary: None,
        };

        assert!(store.transaction(|tx| tx.apply_encounter_update(&start)).unwrap());
        assert!(!store.transaction(|tx| tx.apply_encounter_update(&start)).unwrap());

        let stored = store
            .transaction(|tx| tx.find_encounter(encounter.id))
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, EncounterStatus::InProgress);
        assert_eq!(stored.started_at, Some(now));
    }

    #[test]
    fn test_schema_rejects_inconsistent_lifecycle_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let encounter = seed_encounter(&store);
        let bad = EncounterUpdate {
            encounter_id: encounter.id,
            expected_status: EncounterStatus::Initialized,
            status: EncounterStatus::Completed,
            started_at: Some(Utc::now()),
            ended_at: Some(Utc::now()),
            summary: None,
        };
        let err = store
            .transaction(|tx| tx.apply_encounter_update(&bad))
            .unwrap_err();
        assert!(matches!(err, ClinicError::Database(_)));
    }

    #[test]
    fn test_rolled_back_transaction_discards_writes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let encounter = seed_encounter(&store);
        let observation = NewObservation {
            observation_type: medassist_types::ObservationType::Temperature,
            value: text("37.2"),
            unit: text("C"),
        };

        let result: ClinicResult<()> = store.transaction(|tx| {
            tx.insert_observation(encounter.id, &observation, Utc::now())?;
            Err(ClinicError::invalid_transition("abort"))
        });
        assert!(result.is_err());

        let counts = store.transaction(|tx| tx.child_counts(encounter.id)).unwrap();
        assert_eq!(counts, ChildCounts::default());
    }

    #[test]
    fn test_single_primary_diagnosis_index() {
        let store = SqliteStore::open_in_memory().unwrap();
        let encounter = seed_encounter(&store);
        let primary = NewDiagnosis {
            code: None,
            label: text("Malaria"),
            is_primary: true,
        };

        store
            .transaction(|tx| tx.insert_diagnosis(encounter.id, &primary, Utc::now()))
            .unwrap();
        let duplicate =
            store.transaction(|tx| tx.insert_diagnosis(encounter.id, &primary, Utc::now()));
        assert!(matches!(duplicate, Err(ClinicError::Database(_))));

        let listed = store
            .transaction(|tx| {
                tx.demote_primary_diagnoses(encounter.id)?;
                tx.insert_diagnosis(encounter.id, &primary, Utc::now())?;
                tx.list_diagnoses(encounter.id)
            })
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].is_primary);
        assert!(!listed[1].is_primary);
    }

    #[test]
    fn test_patient_search_escapes_wildcards() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .transaction(|tx| {
                tx.insert_patient(&patient_fields("0788123456", "1199080012345678"), Utc::now())
            })
            .unwrap();

        let by_name = store
            .transaction(|tx| tx.list_patients(Some("  UWA ")))
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let wildcard = store.transaction(|tx| tx.list_patients(Some("%"))).unwrap();
        assert!(wildcard.is_empty());
    }

    #[test]
    fn test_patient_conflicts_ignore_excluded_patient() {
        let store = SqliteStore::open_in_memory().unwrap();
        let patient = store
            .transaction(|tx| {
                tx.insert_patient(&patient_fields("0788123456", "1199080012345678"), Utc::now())
            })
            .unwrap();

        let for_new = store
            .transaction(|tx| tx.patient_conflicts("0788123456", "1199080012345678", None))
            .unwrap();
        assert!(for_new.phone && for_new.national_id);

        let for_self = store
            .transaction(|tx| {
                tx.patient_conflicts("0788123456", "1199080012345678", Some(patient.id))
            })
            .unwrap();
        assert_eq!(for_self, PatientConflicts::default());
    }

    #[test]
    fn test_cascade_delete_removes_clinical_records() {
        let store = SqliteStore::open_in_memory().unwrap();
        let encounter = seed_encounter(&store);
        let observation = NewObservation {
            observation_type: medassist_types::ObservationType::HeartRate,
            value: text("72"),
            unit: text("bpm"),
        };
        store
            .transaction(|tx| tx.insert_observation(encounter.id, &observation, Utc::now()))
            .unwrap();

        let removed = store
            .transaction(|tx| tx.delete_patient_cascade(encounter.patient_id))
            .unwrap();
        assert!(removed);
        assert!(store
            .transaction(|tx| tx.find_encounter(encounter.id))
            .unwrap()
            .is_none());
        assert!(!store
            .transaction(|tx| tx.delete_patient_cascade(encounter.patient_id))
            .unwrap());
    }

    #[test]
    fn test_email_uniqueness_is_case_insensitive() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_encounter(&store);
        assert!(store
            .transaction(|tx| tx.user_email_taken("MUGISHA@clinic.rw"))
            .unwrap());
        assert_eq!(store.transaction(|tx| tx.count_users()).unwrap(), 1);
    }
}
