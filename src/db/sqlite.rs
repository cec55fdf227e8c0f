use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use super::DatabaseError;

/// Create (or upgrade) a user database at the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an existing clinic database without creating or migrating anything.
///
/// The clinic server owns the schema; maintenance runs must not add tables to
/// a live file. Fails when the file is missing or has no `users` table.
pub fn open_existing_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    configure_pragmas(&conn)?;
    if !table_exists(&conn, "users")? {
        return Err(DatabaseError::MissingTable("users".into()));
    }
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;"
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_users.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_database_has_users_table() {
        let conn = open_memory_database().unwrap();
        assert!(table_exists(&conn, "users").unwrap());
        assert!(!table_exists(&conn, "patients").unwrap());
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again, should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn open_existing_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_existing_database(&dir.path().join("absent.db"));
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
    }

    #[test]
    fn open_existing_rejects_file_without_users() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE services (id INTEGER PRIMARY KEY);")
            .unwrap();

        let result = open_existing_database(&path);
        assert!(matches!(result, Err(DatabaseError::MissingTable(t)) if t == "users"));
    }

    #[test]
    fn open_existing_accepts_initialized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        drop(open_database(&path).unwrap());

        let conn = open_existing_database(&path).unwrap();
        assert!(table_exists(&conn, "users").unwrap());
    }
}
