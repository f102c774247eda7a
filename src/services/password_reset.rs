use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::auth::{generate_token, hash_password_blocking};
use crate::core::error::ServiceError;
use crate::core::mailer::{render_password_reset, Mailer};
use crate::core::rate_limit::RateLimiter;
use crate::db::{now, Database};
use crate::models::user::{validate_email, MIN_PASSWORD_LENGTH};
use crate::services::auth::delete_user_sessions;
use crate::services::users::{find_credentials, set_password_hash};

pub const RESET_REQUESTED: &str = "if email exists, reset link has been sent";
pub const RESET_DONE: &str = "password reset successfully";
pub const RESET_SUBJECT: &str = "รีเซ็ตรหัสผ่าน - MySE Portfolio";

const TOKEN_BYTES: usize = 32;
const TOKEN_TTL_MINUTES: i64 = 15;
const MAX_REQUESTS: usize = 3;
const REQUEST_WINDOW: Duration = Duration::from_secs(15 * 60);
const MIN_RESPONSE_TIME: Duration = Duration::from_millis(500);

struct ResetToken {
    email: String,
    expires_at: DateTime<Utc>,
    used: bool,
}

/// Forgot-password and reset-password flows
pub struct PasswordResetService {
    db: Arc<Database>,
    mailer: Arc<dyn Mailer>,
    limiter: RateLimiter,
    frontend_url: String,
    min_response_time: Duration,
}

impl PasswordResetService {
    pub fn new(db: Arc<Database>, mailer: Arc<dyn Mailer>, frontend_url: &str) -> Self {
        Self {
            db,
            mailer,
            limiter: RateLimiter::new(MAX_REQUESTS, REQUEST_WINDOW),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            min_response_time: MIN_RESPONSE_TIME,
        }
    }

    #[cfg(test)]
    fn with_min_response_time(mut self, duration: Duration) -> Self {
        self.min_response_time = duration;
        self
    }

    /// Start a reset. The outcome and timing do not reveal whether the email is registered.
    pub async fn request_reset(&self, email: &str) -> Result<&'static str, ServiceError> {
        let started = Instant::now();
        let result = self.send_reset_link(email).await;
        tokio::time::sleep_until(started + self.min_response_time).await;
        result
    }

    async fn send_reset_link(&self, email: &str) -> Result<&'static str, ServiceError> {
        validate_email(email)?;
        let email = email.trim().to_lowercase();
        if !self.limiter.check(&email) {
            warn!("Password reset rate limit hit for {}", email);
            return Err(ServiceError::TooManyRequests(
                "too many reset requests, please try again in 15 minutes".to_string(),
            ));
        }

        let token = {
            let conn = self.db.lock().await;
            if find_credentials(&conn, &email)?.is_none() {
                info!("Password reset requested for unknown email");
                return Ok(RESET_REQUESTED);
            }
            store_token(&conn, &email)?
        };

        let link = format!("{}/reset-password?token={}", self.frontend_url, token);
        if !self.mailer.delivers() {
            warn!("Password reset link for {}: {}", email, link);
        }
        let html = render_password_reset(&link, TOKEN_TTL_MINUTES)?;
        if let Err(e) = self.mailer.send_html(&email, RESET_SUBJECT, &html).await {
            warn!("Could not email reset link to {} ({}); link: {}", email, e, link);
        }
        Ok(RESET_REQUESTED)
    }

    /// Consume a reset token and set the new password, signing the user out everywhere
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<&'static str, ServiceError> {
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::validation(
                "invalid request, password must be at least 6 characters",
            ));
        }

        let token = token.trim();
        {
            let conn = self.db.lock().await;
            let record = find_token(&conn, token)?.ok_or_else(|| ServiceError::validation("invalid reset link"))?;
            if record.used {
                return Err(already_used());
            }
            if record.expires_at <= now() {
                return Err(ServiceError::validation("reset link has expired, please request a new one"));
            }
        }

        let password_hash = hash_password_blocking(new_password.to_string()).await?;

        let mut conn = self.db.lock().await;
        let tx = conn.transaction()?;
        // Another reset may have consumed the token while the lock was released
        let claimed = tx.execute(
            "UPDATE password_resets SET used = 1 WHERE token = ?1 AND used = 0",
            params![token],
        )?;
        if claimed == 0 {
            return Err(already_used());
        }
        let email = find_token(&tx, token)?
            .map(|record| record.email)
            .ok_or_else(|| ServiceError::validation("invalid reset link"))?;
        let (user, _) = find_credentials(&tx, &email)?.ok_or_else(|| ServiceError::validation("invalid reset link"))?;
        set_password_hash(&tx, user.id, &password_hash)?;
        let revoked = delete_user_sessions(&tx, user.id)?;
        tx.commit()?;

        info!("Password reset for user {} ({} sessions revoked)", user.id, revoked);
        Ok(RESET_DONE)
    }
}

fn already_used() -> ServiceError {
    ServiceError::validation("reset link has already been used, please request a new one")
}

fn store_token(conn: &Connection, email: &str) -> Result<String, ServiceError> {
    let token = generate_token(TOKEN_BYTES);
    let created_at = now();
    conn.execute(
        "INSERT INTO password_resets (email, token, expires_at, used, created_at) VALUES (?1, ?2, ?3, 0, ?4)",
        params![email, token, created_at + ChronoDuration::minutes(TOKEN_TTL_MINUTES), created_at],
    )?;
    Ok(token)
}

fn find_token(conn: &Connection, token: &str) -> Result<Option<ResetToken>, ServiceError> {
    Ok(conn
        .query_row(
            "SELECT email, expires_at, used FROM password_resets WHERE token = ?1",
            params![token],
            |row| {
                Ok(ResetToken {
                    email: row.get(0)?,
                    expires_at: row.get(1)?,
                    used: row.get(2)?,
                })
            },
        )
        .optional()?)
}
