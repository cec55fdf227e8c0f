//! One-off maintenance operations on the clinic database: schema dump and
//! credential repair.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::crypto::{is_password_hash, verify_password, PasswordHasher};
use crate::db::DatabaseError;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub sql: String,
    pub columns: Vec<ColumnInfo>,
}

/// Every user table with its `CREATE` statement and columns, by name.
pub fn dump_schema(conn: &Connection) -> Result<Vec<TableSchema>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, COALESCE(sql, '') FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    tables
        .into_iter()
        .map(|(name, sql)| {
            let columns = table_columns(conn, &name)?;
            Ok(TableSchema { name, sql, columns })
        })
        .collect()
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
    let quoted = table.replace('"', "\"\"");
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{quoted}\")"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                decl_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Store a salted hash of `new_password` for `username`.
pub fn reset_password(
    conn: &Connection,
    hasher: &PasswordHasher,
    username: &str,
    new_password: &str,
) -> Result<(), DatabaseError> {
    let hashed = hasher.hash(new_password);
    let affected = conn.execute(
        "UPDATE users SET password = ?1 WHERE username = ?2",
        params![hashed, username],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "user".into(),
            id: username.into(),
        });
    }
    tracing::info!(username, "Password reset");
    Ok(())
}

/// Replace every clear-text password with a salted hash. Returns rows rewritten.
pub fn hash_legacy_passwords(
    conn: &Connection,
    hasher: &PasswordHasher,
) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, password FROM users ORDER BY id")?;
    let legacy: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|(_, password): &(i64, String)| !is_password_hash(password))
        .collect();
    drop(stmt);

    if legacy.is_empty() {
        tracing::info!("No clear-text passwords left");
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    for (id, password) in &legacy {
        tx.execute(
            "UPDATE users SET password = ?1 WHERE id = ?2",
            params![hasher.hash(password), id],
        )?;
    }
    tx.commit()?;

    tracing::info!(count = legacy.len(), "Hashed clear-text passwords");
    Ok(legacy.len())
}

/// Check a login attempt. Unknown users and clear-text rows never verify.
pub fn verify_user_password(
    conn: &Connection,
    username: &str,
    candidate: &str,
) -> Result<bool, DatabaseError> {
    let stored: Option<String> = match conn.query_row(
        "SELECT password FROM users WHERE username = ?1",
        [username],
        |row| row.get(0),
    ) {
        Ok(p) => Some(p),
        Err(rusqlite::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };
    let Some(stored) = stored else {
        return Ok(false);
    };

    match verify_password(candidate, &stored) {
        Ok(matched) => Ok(matched),
        Err(e) => {
            tracing::warn!(username, error = %e, "Stored password is not hashed; run hash-passwords");
            Ok(false)
        }
    }
}
