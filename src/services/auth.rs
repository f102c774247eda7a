use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::auth::{generate_token, verify_password_blocking};
use crate::core::error::ServiceError;
use crate::db::{now, Database};
use crate::models::user::User;
use crate::services::users::{find_credentials, get_user};

const SESSION_TOKEN_BYTES: usize = 32;
const INVALID_CREDENTIALS: &str = "invalid email or password";

fn unauthorized() -> ServiceError {
    ServiceError::Unauthorized("invalid or expired session".to_string())
}

/// Check credentials and open a new session. The password is verified on the blocking
/// pool with the database lock released.
pub async fn login(
    db: &Database,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> Result<(String, User), ServiceError> {
    let credentials = {
        let conn = db.lock().await;
        find_credentials(&conn, email)?
    };
    let (user, hash) = credentials.ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
    if !verify_password_blocking(password.to_string(), hash).await? {
        debug!("Rejected password for user {}", user.id);
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = {
        let conn = db.lock().await;
        create_session(&conn, user.id, ttl_hours)?
    };
    info!("User {} logged in", user.id);
    Ok((token, user))
}

pub fn create_session(conn: &Connection, user_id: i64, ttl_hours: i64) -> Result<String, ServiceError> {
    let token = generate_token(SESSION_TOKEN_BYTES);
    let created = now();
    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![token, user_id, created, created + Duration::hours(ttl_hours)],
    )?;
    Ok(token)
}

/// Resolve a bearer token to its user; expired sessions are removed on sight
pub fn session_user(conn: &Connection, token: &str) -> Result<User, ServiceError> {
    if token.is_empty() {
        return Err(unauthorized());
    }
    let session: Option<(i64, DateTime<Utc>)> = conn
        .query_row(
            "SELECT user_id, expires_at FROM sessions WHERE token = ?1",
            params![token],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match session {
        Some((user_id, expires_at)) if expires_at > now() => get_user(conn, user_id).map_err(|_| unauthorized()),
        Some(_) => {
            delete_session(conn, token)?;
            Err(unauthorized())
        }
        None => Err(unauthorized()),
    }
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<(), ServiceError> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Revoke every session of a user, returning how many were removed
pub fn delete_user_sessions(conn: &Connection, user_id: i64) -> Result<usize, ServiceError> {
    Ok(conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?)
}

/// Drop sessions past their expiry
pub fn purge_expired_sessions(conn: &Connection) -> Result<usize, ServiceError> {
    Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now()])?)
}
