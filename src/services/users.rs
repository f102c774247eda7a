use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::config::AdminSeed;
use crate::core::auth::hash_password;
use crate::core::error::{map_constraint, ServiceError};
use crate::db::now;
use crate::models::user::{
    validate_email, validate_password, AccountType, NewUser, PersonalInfo, ProfileImageUpdate, SelfUpdate, User,
    UserUpdate,
};

pub(crate) const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, id_number, id_doc_type, \
     birthday, pdpa_consent, profile_image_url, account_type, created_at, updated_at";

const EMAIL_TAKEN: &str = "email already exists";

pub(crate) fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        id_number: row.get(5)?,
        id_doc_type: row.get(6)?,
        birthday: row.get(7)?,
        pdpa_consent: row.get(8)?,
        profile_image_url: row.get(9)?,
        account_type_id: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User, ServiceError> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| ServiceError::not_found("User not found"))
}

/// User and password hash for the given email
pub fn find_credentials(conn: &Connection, email: &str) -> Result<Option<(User, String)>, ServiceError> {
    let found = conn
        .query_row(
            &format!("SELECT {}, password_hash FROM users WHERE email = ?1", USER_COLUMNS),
            params![normalize_email(email)],
            |row| Ok((user_from_row(row)?, row.get::<_, String>(13)?)),
        )
        .optional()?;
    Ok(found)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, ServiceError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![normalize_email(email)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_users(conn: &Connection, account_type: Option<i64>) -> Result<Vec<User>, ServiceError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE (?1 IS NULL OR account_type = ?1) ORDER BY id",
        USER_COLUMNS
    ))?;
    let users = stmt
        .query_map(params![account_type], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Ids of every student account, for notification fan-out
pub fn student_ids(conn: &Connection) -> Result<Vec<i64>, ServiceError> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE account_type = ?1 ORDER BY id")?;
    let ids = stmt
        .query_map(params![AccountType::Student.id()], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Insert an account. `password_hash` is the derived hash of `input.password`.
pub fn create_user(conn: &Connection, input: &NewUser, password_hash: &str) -> Result<User, ServiceError> {
    input.validate()?;
    let timestamp = now();
    conn.execute(
        "INSERT INTO users (email, password_hash, first_name, last_name, phone, id_number, id_doc_type,
                            birthday, pdpa_consent, profile_image_url, account_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            normalize_email(&input.email),
            password_hash,
            input.first_name.trim(),
            input.last_name.trim(),
            input.phone.trim(),
            input.id_number.trim(),
            input.id_doc_type.trim(),
            input.birthday,
            input.pdpa_consent,
            input.profile_image_url.trim(),
            input.account_type_id,
            timestamp,
        ],
    )
    .map_err(|e| map_constraint(e, EMAIL_TAKEN))?;

    let user = get_user(conn, conn.last_insert_rowid())?;
    info!("Created user {} ({})", user.id, user.email);
    Ok(user)
}

/// Apply a partial update. A new password arrives already hashed in `password_hash`.
pub fn update_user(
    conn: &Connection,
    id: i64,
    update: &UserUpdate,
    password_hash: Option<&str>,
) -> Result<User, ServiceError> {
    update.validate()?;
    let mut user = get_user(conn, id)?;

    if let Some(email) = &update.email {
        user.email = normalize_email(email);
    }
    if let Some(v) = &update.first_name {
        user.first_name = v.trim().to_string();
    }
    if let Some(v) = &update.last_name {
        user.last_name = v.trim().to_string();
    }
    if let Some(v) = &update.phone {
        user.phone = v.trim().to_string();
    }
    if let Some(v) = &update.id_number {
        user.id_number = v.trim().to_string();
    }
    if let Some(v) = &update.id_doc_type {
        user.id_doc_type = v.trim().to_string();
    }
    if update.birthday.is_some() {
        user.birthday = update.birthday;
    }
    if let Some(v) = update.pdpa_consent {
        user.pdpa_consent = v;
    }
    if let Some(v) = &update.profile_image_url {
        user.profile_image_url = v.trim().to_string();
    }
    if let Some(v) = update.account_type_id {
        user.account_type_id = v;
    }

    conn.execute(
        "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, phone = ?4, id_number = ?5,
                id_doc_type = ?6, birthday = ?7, pdpa_consent = ?8, profile_image_url = ?9,
                account_type = ?10, updated_at = ?11
         WHERE id = ?12",
        params![
            user.email,
            user.first_name,
            user.last_name,
            user.phone,
            user.id_number,
            user.id_doc_type,
            user.birthday,
            user.pdpa_consent,
            user.profile_image_url,
            user.account_type_id,
            now(),
            id,
        ],
    )
    .map_err(|e| map_constraint(e, EMAIL_TAKEN))?;

    if let Some(hash) = password_hash {
        set_password_hash(conn, id, hash)?;
    }
    get_user(conn, id)
}

pub fn update_personal_info(conn: &Connection, id: i64, info: &PersonalInfo) -> Result<User, ServiceError> {
    info.validate()?;
    let update = UserUpdate {
        first_name: info.first_name.clone(),
        last_name: info.last_name.clone(),
        phone: info.phone.clone(),
        birthday: info.birthday,
        profile_image_url: info.profile_image_url.clone(),
        pdpa_consent: info.pdpa_consent,
        ..Default::default()
    };
    update_user(conn, id, &update, None)
}

pub fn update_me(conn: &Connection, id: i64, input: &SelfUpdate) -> Result<User, ServiceError> {
    input.validate()?;
    let update = UserUpdate {
        email: input.email.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        phone: input.phone.clone(),
        birthday: input.birthday,
        ..Default::default()
    };
    update_user(conn, id, &update, None)
}

/// Replace the profile picture; an empty URL clears it
pub fn set_profile_image(conn: &Connection, id: i64, input: &ProfileImageUpdate) -> Result<User, ServiceError> {
    input.validate()?;
    let affected = conn.execute(
        "UPDATE users SET profile_image_url = ?1, updated_at = ?2 WHERE id = ?3",
        params![input.profile_image_url.trim(), now(), id],
    )?;
    if affected == 0 {
        return Err(ServiceError::not_found("User not found"));
    }
    get_user(conn, id)
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn
        .execute("DELETE FROM users WHERE id = ?1", params![id])
        .map_err(|e| map_constraint(e, EMAIL_TAKEN))?;
    if affected == 0 {
        return Err(ServiceError::not_found("User not found"));
    }
    info!("Deleted user {}", id);
    Ok(())
}

pub fn set_password_hash(conn: &Connection, id: i64, password_hash: &str) -> Result<(), ServiceError> {
    let affected = conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        params![password_hash, now(), id],
    )?;
    if affected == 0 {
        return Err(ServiceError::not_found("User not found"));
    }
    Ok(())
}

/// Create the bootstrap admin when no admin account exists yet
pub fn ensure_admin(conn: &Connection, seed: &AdminSeed) -> Result<bool, ServiceError> {
    let admins: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE account_type = ?1",
        params![AccountType::Admin.id()],
        |row| row.get(0),
    )?;
    if admins > 0 {
        return Ok(false);
    }

    validate_email(&seed.email)?;
    validate_password(&seed.password)?;
    let timestamp = now();
    conn.execute(
        "INSERT INTO users (email, password_hash, first_name, pdpa_consent, account_type, created_at, updated_at)
         VALUES (?1, ?2, 'Administrator', 1, ?3, ?4, ?4)",
        params![normalize_email(&seed.email), hash_password(&seed.password), AccountType::Admin.id(), timestamp],
    )
    .map_err(|e| map_constraint(e, EMAIL_TAKEN))?;
    info!("Seeded admin account {}", seed.email);
    Ok(true)
}
