use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "clinic-roles";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "CLINIC_DB_PATH";

/// Database file name used by the clinic server.
pub const DB_FILE_NAME: &str = "clinic.db";

/// Platform data dir (e.g. ~/.local/share/clinic), falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clinic")
}

/// Database used when neither `--db` nor `CLINIC_DB_PATH` is given
pub fn default_database_path() -> PathBuf {
    app_data_dir().join(DB_FILE_NAME)
}

/// Log filter applied when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "clinic_roles=info,warn"
}
