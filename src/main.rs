// clinic-roles - maintenance commands for the clinic user store

mod exit_codes;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use clinic_roles::crypto::PasswordHasher;
use clinic_roles::db::{open_database, SqliteUserStore};
use clinic_roles::models::RoleField;
use clinic_roles::roles::{self, ReconcileError};
use clinic_roles::{config, maintenance};

use exit_codes::{
    outcome_exit_code, EXIT_AUTH_FAILED, EXIT_ERROR, EXIT_STORE_UNAVAILABLE, EXIT_SUCCESS,
    EXIT_VERIFY_MISMATCH,
};

#[derive(Parser)]
#[command(name = config::APP_NAME)]
#[command(about = "Role reconciliation and credential maintenance for the clinic user store")]
#[command(version)]
struct Cli {
    /// SQLite database of the clinic server
    #[arg(long, global = true, env = config::DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite role fields to the canonical vocabulary, then verify
    #[command(after_help = "\
Exit codes:
  0  store verified clean
  3  inconsistencies remain after the run
  4  database could not be opened
  5  some values failed to update")]
    Reconcile,

    /// Report role inconsistencies without writing
    Verify,

    /// List distinct values stored in the role columns
    ListRoles {
        /// Only this column (default: all three)
        #[arg(long)]
        field: Option<FieldArg>,
    },

    /// Show the canonical label a role string would be rewritten to
    Classify {
        value: String,
    },

    /// Print the CREATE statement and columns of every table
    Schema,

    /// Replace one user's password with a salted hash
    ResetPassword {
        #[arg(long)]
        username: String,

        /// New password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Hash every remaining clear-text password
    HashPasswords,

    /// Check a password against the stored hash
    CheckPassword {
        #[arg(long)]
        username: String,

        /// Candidate password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create the users schema in a new database file
    Init,
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Role,
    UserRole,
    EmployeeRole,
}

impl From<FieldArg> for RoleField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Role => RoleField::Role,
            FieldArg::UserRole => RoleField::UserRole,
            FieldArg::EmployeeRole => RoleField::EmployeeRole,
        }
    }
}

fn main() -> ExitCode {
    clinic_roles::init_tracing();
    let cli = Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(config::default_database_path);
    tracing::debug!(version = config::APP_VERSION, db = %db_path.display(), "clinic-roles starting");

    match run(cli.command, &db_path, cli.json) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Database(#[from] clinic_roles::db::DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Reconcile(ReconcileError::StoreUnavailable(_)) => EXIT_STORE_UNAVAILABLE,
            _ => EXIT_ERROR,
        }
    }
}

fn open_store(path: &Path) -> Result<SqliteUserStore, CliError> {
    SqliteUserStore::open(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Cannot open user store");
        CliError::from(ReconcileError::StoreUnavailable(e))
    })
}

fn emit<T: Serialize + std::fmt::Display>(value: &T, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{value}");
    }
    Ok(())
}

fn password_arg(password: Option<String>) -> Result<String, CliError> {
    match password {
        Some(p) => Ok(p),
        None => {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

fn run(command: Commands, db_path: &Path, json: bool) -> Result<u8, CliError> {
    match command {
        Commands::Reconcile => {
            let store = open_store(db_path)?;
            let report = roles::reconcile(&store)?;
            emit(&report, json)?;
            Ok(outcome_exit_code(report.outcome()))
        }
        Commands::Verify => {
            let store = open_store(db_path)?;
            let report = roles::verify(&store)?;
            emit(&report, json)?;
            Ok(if report.is_clean() { EXIT_SUCCESS } else { EXIT_VERIFY_MISMATCH })
        }
        Commands::ListRoles { field } => {
            let store = open_store(db_path)?;
            let dump = match field {
                Some(f) => {
                    let field = RoleField::from(f);
                    vec![(field, roles::list_distinct_role_values(&store, field)?)]
                }
                None => roles::role_dump(&store)?,
            };
            if json {
                let map: serde_json::Map<String, serde_json::Value> = dump
                    .into_iter()
                    .map(|(field, values)| (field.as_str().to_string(), values.into()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (field, values) in dump {
                    println!("{field} ({}):", values.len());
                    for value in values {
                        println!("  {value}");
                    }
                }
            }
            Ok(EXIT_SUCCESS)
        }
        Commands::Classify { value } => {
            let (canonical, rule) = roles::classify_with_rule(&value);
            if json {
                let out = serde_json::json!({
                    "value": value,
                    "canonical": canonical,
                    "matched_by": rule,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{value:?} -> {canonical} ({})", rule.as_str());
            }
            Ok(EXIT_SUCCESS)
        }
        Commands::Schema => {
            let store = open_store(db_path)?;
            let schema = maintenance::dump_schema(store.connection())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                for table in schema {
                    println!("{};", table.sql);
                    for c in table.columns {
                        let pk = if c.primary_key { " PRIMARY KEY" } else { "" };
                        let nn = if c.not_null { " NOT NULL" } else { "" };
                        println!("  -- {} {}{pk}{nn}", c.name, c.decl_type);
                    }
                }
            }
            Ok(EXIT_SUCCESS)
        }
        Commands::ResetPassword { username, password } => {
            let store = open_store(db_path)?;
            let password = password_arg(password)?;
            maintenance::reset_password(store.connection(), &PasswordHasher::default(), &username, &password)?;
            println!("Password reset for {username}");
            Ok(EXIT_SUCCESS)
        }
        Commands::HashPasswords => {
            let store = open_store(db_path)?;
            let count = maintenance::hash_legacy_passwords(store.connection(), &PasswordHasher::default())?;
            println!("Hashed {count} clear-text passwords");
            Ok(EXIT_SUCCESS)
        }
        Commands::CheckPassword { username, password } => {
            let store = open_store(db_path)?;
            let password = password_arg(password)?;
            if maintenance::verify_user_password(store.connection(), &username, &password)? {
                println!("Password matches");
                Ok(EXIT_SUCCESS)
            } else {
                println!("Password does not match");
                Ok(EXIT_AUTH_FAILED)
            }
        }
        Commands::Init => {
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            drop(open_database(db_path)?);
            println!("Initialized {}", db_path.display());
            Ok(EXIT_SUCCESS)
        }
    }
}
