use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

const USER_COLUMNS: &str = "id, username, password_hash, role, full_name, created_at";

/// Insert a staff account. `password_hash` must already be a PHC-style
/// string produced by `crypto::hash_password`.
pub fn insert_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: UserRole,
    full_name: &str,
) -> Result<User, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, password_hash, role, full_name)
         VALUES (?1, ?2, ?3, ?4)",
        params![username, password_hash, role.as_str(), full_name],
    )
    .map_err(|e| {
        if super::is_constraint_violation(&e) {
            DatabaseError::ConstraintViolation(format!("Username already exists: {username}"))
        } else {
            DatabaseError::Sqlite(e)
        }
    })?;

    let id = conn.last_insert_rowid();
    get_user(conn, id)?.ok_or_else(|| DatabaseError::not_found("User", id))
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, params![id], user_row).optional()?;
    row.map(user_from_row).transpose()
}

pub fn get_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    let row = conn.query_row(&sql, params![username], user_row).optional()?;
    row.map(user_from_row).transpose()
}

type UserRow = (i64, String, String, String, String, chrono::NaiveDateTime);

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    let (id, username, password_hash, role, full_name, created_at) = row;
    Ok(User {
        id,
        username,
        password_hash,
        role: UserRole::from_str(&role)?,
        full_name,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_lookup_by_username() {
        let conn = open_memory_database().unwrap();
        let user = insert_user(&conn, "drmehta", "hash", UserRole::Doctor, "Dr. Mehta").unwrap();
        assert!(user.id > 0);

        let found = get_user_by_username(&conn, "drmehta").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, UserRole::Doctor);
        assert_eq!(found.password_hash, "hash");
        assert!(get_user_by_username(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, "admin", "h", UserRole::Admin, "Admin").unwrap();
        let err = insert_user(&conn, "admin", "h2", UserRole::Admin, "Admin 2").unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn unknown_stored_role_is_invalid_enum() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO users (username, password_hash, role, full_name)
             VALUES ('x', 'h', 'wizard', 'X')",
            [],
        )
        .unwrap();
        let err = get_user_by_username(&conn, "x").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }
}
