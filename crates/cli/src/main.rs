use api_shared::{EncounterRes, PatientRes, UserRes};
use clap::{Parser, Subcommand};
use medassist_core::config::{busy_timeout_from_env_value, database_path_from_env_value};
use medassist_core::models::EncounterFilter;
use medassist_core::validation::UserInput;
use medassist_core::{
    Actor, CoreConfig, EncounterService, PatientService, SqliteStore, UserService,
};
use medassist_types::EncounterStatus;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "medassist")]
#[command(about = "MedAssist clinic records CLI")]
struct Cli {
    /// SQLite database file (defaults to MEDASSIST_DATABASE_PATH, then medassist.db)
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Id of the user to act as
    #[arg(long, global = true)]
    as_user: Option<i64>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Migrate,
    /// Patient directory
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },
    /// User administration
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Encounter lifecycle
    Encounters {
        #[command(subcommand)]
        command: EncounterCommands,
    },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List patients
    List {
        /// Case-insensitive match on names, phone, national id and address
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create the first administrator of an empty database
    Bootstrap { name: String, email: String },
    /// Create a user
    Create {
        name: String,
        email: String,
        /// ADMIN, DOCTOR or NURSE
        role: String,
    },
    /// List users
    List {
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
enum EncounterCommands {
    /// Create an encounter for a patient
    Create { patient_id: i64 },
    /// Start the consultation
    Start { id: i64 },
    /// End the consultation with a summary
    End {
        id: i64,
        #[arg(long)]
        summary: String,
    },
    /// Cancel the consultation
    Cancel { id: i64 },
    /// Show an encounter with its record counts
    Show { id: i64 },
    /// List encounters, most recently started first
    List {
        #[arg(long)]
        patient_id: Option<i64>,
        /// INITIALIZED, IN_PROGRESS, COMPLETED or CANCELED
        #[arg(long)]
        status: Option<EncounterStatus>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_store(database: Option<PathBuf>) -> Result<Arc<SqliteStore>, Box<dyn Error>> {
    let path = database.unwrap_or_else(|| {
        database_path_from_env_value(std::env::var("MEDASSIST_DATABASE_PATH").ok())
    });
    let busy_timeout =
        busy_timeout_from_env_value(std::env::var("MEDASSIST_BUSY_TIMEOUT_MS").ok())?;
    let cfg = CoreConfig::new(path, busy_timeout)?;
    Ok(Arc::new(SqliteStore::open(&cfg)?))
}

fn acting_user(store: &Arc<SqliteStore>, as_user: Option<i64>) -> Result<Actor, Box<dyn Error>> {
    let user_id = as_user.ok_or("this command needs --as-user <id>")?;
    Ok(UserService::new(Arc::clone(store)).resolve_actor(user_id)?)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let Some(command) = cli.command else {
        println!("Use 'medassist --help' for commands");
        return Ok(());
    };
    let store = open_store(cli.database)?;

    match command {
        Commands::Migrate => {
            println!("Database schema is up to date");
        }
        Commands::Patients {
            command: PatientCommands::List { search },
        } => {
            let actor = acting_user(&store, cli.as_user)?;
            let patients = PatientService::new(store).list(&actor, search.as_deref())?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                let patients: Vec<PatientRes> = patients.into_iter().map(Into::into).collect();
                print_json(&patients)?;
            }
        }
        Commands::Users { command } => {
            let users = UserService::new(Arc::clone(&store));
            match command {
                UserCommands::Bootstrap { name, email } => {
                    let user = users.bootstrap_admin(&name, &email)?;
                    print_json(&UserRes::from(user))?;
                }
                UserCommands::Create { name, email, role } => {
                    let actor = acting_user(&store, cli.as_user)?;
                    let input = UserInput {
                        name: Some(name),
                        email: Some(email),
                        role: Some(role),
                    };
                    print_json(&UserRes::from(users.create(&actor, &input)?))?;
                }
                UserCommands::List { search } => {
                    let actor = acting_user(&store, cli.as_user)?;
                    let list: Vec<UserRes> = users
                        .list(&actor, search.as_deref())?
                        .into_iter()
                        .map(Into::into)
                        .collect();
                    print_json(&list)?;
                }
            }
        }
        Commands::Encounters { command } => {
            let actor = acting_user(&store, cli.as_user)?;
            let encounters = EncounterService::new(store);
            let res: EncounterRes = match command {
                EncounterCommands::Create { patient_id } => {
                    encounters.create(&actor, Some(patient_id))?.into()
                }
                EncounterCommands::Start { id } => encounters.start(&actor, id)?.into(),
                EncounterCommands::End { id, summary } => {
                    encounters.end(&actor, id, Some(summary.as_str()))?.into()
                }
                EncounterCommands::Cancel { id } => encounters.cancel(&actor, id)?.into(),
                EncounterCommands::Show { id } => encounters.get(&actor, id)?.into(),
                EncounterCommands::List { patient_id, status } => {
                    let filter = EncounterFilter { patient_id, status };
                    let list: Vec<EncounterRes> = encounters
                        .list(&actor, &filter)?
                        .into_iter()
                        .map(Into::into)
                        .collect();
                    return print_json(&list);
                }
            };
            print_json(&res)?;
        }
    }

    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_actor_after_subcommand() {
        let cli = Cli::parse_from([
            "medassist",
            "encounters",
            "end",
            "7",
            "--summary",
            "Stable",
            "--as-user",
            "2",
        ]);
        assert_eq!(cli.as_user, Some(2));
        assert!(matches!(
            cli.command,
            Some(Commands::Encounters {
                command: EncounterCommands::End { id: 7, .. }
            })
        ));
    }

    #[test]
    fn test_status_filter_uses_literal_spelling() {
        let cli = Cli::parse_from(["medassist", "encounters", "list", "--status", "IN_PROGRESS"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Encounters {
                command: EncounterCommands::List {
                    status: Some(EncounterStatus::InProgress),
                    ..
                }
            })
        ));
        assert!(Cli::try_parse_from(["medassist", "encounters", "list", "--status", "PAUSED"])
            .is_err());
    }

    #[test]
    fn test_bootstrap_then_encounter_flow() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("clinic.db");
        let arg = db.to_str().unwrap();

        run(Cli::parse_from(["medassist", "--database", arg, "migrate"])).unwrap();
        run(Cli::parse_from([
            "medassist", "--database", arg, "users", "bootstrap", "Root", "root@clinic.test",
        ]))
        .unwrap();
        let err = run(Cli::parse_from([
            "medassist", "--database", arg, "users", "bootstrap", "Again", "again@clinic.test",
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "An administrator account already exists.");

        let err = run(Cli::parse_from([
            "medassist", "--database", arg, "encounters", "show", "1",
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "this command needs --as-user <id>");

        let err = run(Cli::parse_from([
            "medassist", "--database", arg, "--as-user", "1", "encounters", "start", "9",
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Encounter not found");
    }
}
