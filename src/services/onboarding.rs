use log::info;
use rusqlite::Connection;

use crate::core::error::ServiceError;
use crate::models::user::{OnboardingInput, OnboardingStatus, User, UserProfile};
use crate::services::education::{get_education, upsert_education};
use crate::services::users::{get_user, update_personal_info};

pub fn get_profile(conn: &Connection, user_id: i64) -> Result<UserProfile, ServiceError> {
    let user = get_user(conn, user_id)?;
    let education_info = get_education(conn, user_id)?;
    Ok(UserProfile { user, education_info })
}

fn missing_fields(user: &User, has_education: bool) -> Vec<String> {
    let mut missing = Vec::new();
    if user.first_name.trim().is_empty() {
        missing.push("first_name");
    }
    if user.last_name.trim().is_empty() {
        missing.push("last_name");
    }
    if user.phone.trim().is_empty() {
        missing.push("phone");
    }
    if user.birthday.is_none() {
        missing.push("birthday");
    }
    if !has_education {
        missing.push("education_info");
    }
    missing.into_iter().map(String::from).collect()
}

pub fn onboarding_status(conn: &Connection, user_id: i64) -> Result<OnboardingStatus, ServiceError> {
    let profile = get_profile(conn, user_id)?;
    let missing_fields = missing_fields(&profile.user, profile.education_info.is_some());
    Ok(OnboardingStatus { completed: missing_fields.is_empty(), missing_fields })
}

/// Save personal details and education together; either both land or neither does
pub fn complete_onboarding(
    conn: &mut Connection,
    user_id: i64,
    input: &OnboardingInput,
) -> Result<UserProfile, ServiceError> {
    let tx = conn.transaction()?;
    update_personal_info(&tx, user_id, &input.personal_info)?;
    upsert_education(&tx, user_id, &input.education_info)?;
    tx.commit()?;

    info!("User {} completed onboarding", user_id);
    get_profile(conn, user_id)
}
