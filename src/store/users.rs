use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{PocdeskError, Result};
use crate::model::{Role, User};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Look up a recognized identity. Matching is case-insensitive on email.
pub fn resolve_user(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Ok(None);
    }
    let row = conn
        .query_row(
            "SELECT email, name, role FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(email, name, role)| {
        Ok(User {
            email,
            name,
            role: role.parse()?,
        })
    })
    .transpose()
}

/// Create a user or update name/role of an existing one
pub fn upsert_user(conn: &Connection, email: &str, name: &str, role: Role) -> Result<User> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(PocdeskError::Validation("User email is required".to_string()));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(PocdeskError::Validation("User name is required".to_string()));
    }

    conn.execute(
        "INSERT INTO users (email, name, role) VALUES (?1, ?2, ?3) \
         ON CONFLICT(email) DO UPDATE SET name = excluded.name, role = excluded.role",
        params![email, name, role.as_str()],
    )?;

    Ok(User {
        email,
        name: name.to_string(),
        role,
    })
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT email, name, role FROM users ORDER BY email")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    rows.into_iter()
        .map(|(email, name, role)| {
            Ok(User {
                email,
                name,
                role: role.parse()?,
            })
        })
        .collect()
}
