//! User store: the only path through which role maintenance touches the
//! `users` table.

use std::path::Path;

use rusqlite::{params, Connection};

use super::sqlite::{open_existing_database, open_memory_database};
use super::DatabaseError;
use crate::models::{RoleField, RolePair, UserRecord};

/// Operations the reconciliation process needs from the user table.
pub trait UserStore {
    /// Distinct non-null, non-empty values of `field`, sorted lexically.
    fn query_distinct(&self, field: RoleField) -> Result<Vec<String>, DatabaseError>;

    /// Set `field = new_value` on every row where `field = match_value`.
    fn update_where(
        &self,
        field: RoleField,
        match_value: &str,
        new_value: &str,
    ) -> Result<usize, DatabaseError>;

    /// Distinct `(role, userRole)` combinations present in the table.
    fn distinct_role_pairs(&self) -> Result<Vec<RolePair>, DatabaseError>;

    /// Rewrite every row holding exactly `current` (NULL-aware) to `new`.
    fn update_role_pair(&self, current: &RolePair, new: &RolePair) -> Result<usize, DatabaseError>;

    fn scan_all(&self) -> Result<Vec<UserRecord>, DatabaseError>;
}

/// SQLite-backed user store. Owns its connection; dropping the store closes it.
pub struct SqliteUserStore {
    conn: Connection,
}

impl SqliteUserStore {
    /// Open an existing clinic database. Never creates the file or schema.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = open_existing_database(path)?;
        tracing::debug!(path = %path.display(), "Opened user store");
        Ok(Self { conn })
    }

    /// Fresh in-memory store with the users schema (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Quoted column identifier. Only ever built from [`RoleField`], never user input.
fn column(field: RoleField) -> String {
    format!("\"{}\"", field.as_str())
}

/// Role column read as text under binary collation.
///
/// Legacy tables may declare role columns `COLLATE NOCASE`, which would merge
/// `Dentist` and `dentist` in DISTINCT and `=`, or leave them untyped so a
/// value comes back as an integer.
fn text_of(col: &str) -> String {
    format!("CAST({col} AS TEXT) COLLATE BINARY")
}

impl UserStore for SqliteUserStore {
    fn query_distinct(&self, field: RoleField) -> Result<Vec<String>, DatabaseError> {
        let value = text_of(&column(field));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT {value} FROM users
             WHERE {value} IS NOT NULL AND {value} != ''"
        ))?;
        let mut values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        values.sort();
        Ok(values)
    }

    fn update_where(
        &self,
        field: RoleField,
        match_value: &str,
        new_value: &str,
    ) -> Result<usize, DatabaseError> {
        let col = column(field);
        let value = text_of(&col);
        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute(
            &format!("UPDATE users SET {col} = ?1 WHERE {value} = ?2"),
            params![new_value, match_value],
        )?;
        tx.commit()?;
        Ok(affected)
    }

    fn distinct_role_pairs(&self) -> Result<Vec<RolePair>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT {}, {} FROM users",
            text_of("role"),
            text_of("userRole")
        ))?;
        let mut pairs = stmt
            .query_map([], |row| {
                Ok(RolePair {
                    role: row.get(0)?,
                    user_role: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        pairs.sort();
        Ok(pairs)
    }

    fn update_role_pair(&self, current: &RolePair, new: &RolePair) -> Result<usize, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute(
            &format!(
                "UPDATE users SET role = ?1, userRole = ?2
                 WHERE {} IS ?3 AND {} IS ?4",
                text_of("role"),
                text_of("userRole")
            ),
            params![new.role, new.user_role, current.role, current.user_role],
        )?;
        tx.commit()?;
        Ok(affected)
    }

    fn scan_all(&self) -> Result<Vec<UserRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, username, password, {}, {}, {}, status
             FROM users ORDER BY id",
            text_of("role"),
            text_of("userRole"),
            text_of("employeeRole")
        ))?;
        let records = stmt
            .query_map([], |row| {
                Ok(UserRecord {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password: row.get(2)?,
                    role: row.get(3)?,
                    user_role: row.get(4)?,
                    employee_role: row.get(5)?,
                    status: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// Insert a user row as the clinic server would (for tests and seeding).
pub fn insert_user(
    conn: &Connection,
    username: &str,
    password: &str,
    role: Option<&str>,
    user_role: Option<&str>,
    employee_role: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, password, role, userRole, employeeRole, status)
         VALUES (?1, ?2, ?3, ?4, ?5, 'active')",
        params![username, password, role, user_role, employee_role],
    )?;
    Ok(conn.last_insert_rowid())
}
