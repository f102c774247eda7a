use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::ServiceError;
use crate::models::education::{EducationInfo, EducationInput};
use crate::models::validation::{invalid, is_email, is_url_or_upload_path};

/// Identity document types accepted at registration
pub const ID_DOC_TYPES: [&str; 3] = ["ID Card", "Passport", "G-Code"];

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// Builds portfolios and submits them
    Student,
    /// Reviews submissions
    Teacher,
    /// Manages users and reference data; may also review
    Admin,
}

impl AccountType {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(AccountType::Student),
            2 => Some(AccountType::Teacher),
            3 => Some(AccountType::Admin),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            AccountType::Student => 1,
            AccountType::Teacher => 2,
            AccountType::Admin => 3,
        }
    }

    /// Teachers and admins may review submissions
    pub fn is_reviewer(self) -> bool {
        matches!(self, AccountType::Teacher | AccountType::Admin)
    }
}

/// A registered account. The password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub id_number: String,
    pub id_doc_type: String,
    pub birthday: Option<NaiveDate>,
    pub pdpa_consent: bool,
    pub profile_image_url: String,
    pub account_type_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn account_type(&self) -> Option<AccountType> {
        AccountType::from_id(self.account_type_id)
    }
}

/// Payload for creating an account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub id_doc_type: String,
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub pdpa_consent: bool,
    #[serde(default)]
    pub profile_image_url: String,
    pub account_type_id: Option<i64>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_phone(&self.phone)?;
        if self.id_number.trim().is_empty() {
            return invalid("ID number is required");
        }
        validate_id_doc_type(&self.id_doc_type)?;
        if self.birthday.is_none() {
            return invalid("Birthday is required");
        }
        if !self.pdpa_consent {
            return invalid("PDPA consent is required");
        }
        validate_profile_image(&self.profile_image_url)?;
        match self.account_type_id {
            None | Some(0) => invalid("Account type is required"),
            Some(id) if AccountType::from_id(id).is_none() => invalid("Account type is invalid"),
            Some(_) => Ok(()),
        }
    }
}

/// Partial update of an account by an admin
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub id_number: Option<String>,
    pub id_doc_type: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub pdpa_consent: Option<bool>,
    pub profile_image_url: Option<String>,
    pub account_type_id: Option<i64>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(id_number) = &self.id_number {
            if id_number.trim().is_empty() {
                return invalid("ID number is required");
            }
        }
        if let Some(doc_type) = &self.id_doc_type {
            validate_id_doc_type(doc_type)?;
        }
        if self.pdpa_consent == Some(false) {
            return invalid("PDPA consent is required");
        }
        if let Some(url) = &self.profile_image_url {
            validate_profile_image(url)?;
        }
        if let Some(id) = self.account_type_id {
            if AccountType::from_id(id).is_none() {
                return invalid("Account type is invalid");
            }
        }
        Ok(())
    }
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub profile_image_url: Option<String>,
    pub pdpa_consent: Option<bool>,
}

impl PersonalInfo {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(url) = &self.profile_image_url {
            validate_profile_image(url)?;
        }
        if self.pdpa_consent == Some(false) {
            return invalid("PDPA consent is required");
        }
        Ok(())
    }
}

/// Account fields a signed-in user may change about themselves. Role, password and
/// identity documents are not accepted here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelfUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
}

impl SelfUpdate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileImageUpdate {
    pub profile_image_url: String,
}

impl ProfileImageUpdate {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_profile_image(self.profile_image_url.trim())
    }
}

/// A user together with their education record
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub education_info: Option<EducationInfo>,
}

/// Whether a student has filled in everything onboarding asks for
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OnboardingStatus {
    pub completed: bool,
    pub missing_fields: Vec<String>,
}

/// Onboarding form: personal details and education saved together
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnboardingInput {
    #[serde(default)]
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub education_info: EducationInput,
}

pub fn validate_email(email: &str) -> Result<(), ServiceError> {
    let email = email.trim();
    if email.is_empty() {
        return invalid("Email is required");
    }
    if !is_email(email) {
        return invalid("Email is invalid");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.is_empty() {
        return invalid("Password is required");
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return invalid("Password must be at least 6 characters");
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ServiceError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return invalid("Phone is required");
    }
    if !phone.chars().all(|c| c.is_ascii_digit()) {
        return invalid("Phone must be numeric");
    }
    if phone.len() != 10 {
        return invalid("Phone must be 10 digits");
    }
    Ok(())
}

fn validate_id_doc_type(doc_type: &str) -> Result<(), ServiceError> {
    if doc_type.trim().is_empty() {
        return invalid("ID doc type is required");
    }
    if !ID_DOC_TYPES.contains(&doc_type.trim()) {
        return invalid("ID doc type must be one of: ID Card, Passport, G-Code");
    }
    Ok(())
}

fn validate_profile_image(url: &str) -> Result<(), ServiceError> {
    if !url.is_empty() && !is_url_or_upload_path(url) {
        return invalid("Profile image must be a valid URL");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_user() -> NewUser {
        NewUser {
            email: "student@example.com".to_string(),
            password: "secret1".to_string(),
            first_name: "Somchai".to_string(),
            last_name: "Jaidee".to_string(),
            phone: "0812345678".to_string(),
            id_number: "1103700000000".to_string(),
            id_doc_type: "ID Card".to_string(),
            birthday: NaiveDate::from_ymd_opt(2007, 5, 1),
            pdpa_consent: true,
            profile_image_url: String::new(),
            account_type_id: Some(1),
        }
    }

    fn message(result: Result<(), ServiceError>) -> String {
        match result {
            Err(ServiceError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_user_passes() {
        assert!(valid_user().validate().is_ok());
    }

    #[test]
    fn test_names_are_optional() {
        let user = NewUser { first_name: String::new(), last_name: String::new(), ..valid_user() };
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_email_rules() {
        let user = NewUser { email: String::new(), ..valid_user() };
        assert_eq!(message(user.validate()), "Email is required");
        let user = NewUser { email: "not-an-email".to_string(), ..valid_user() };
        assert_eq!(message(user.validate()), "Email is invalid");
    }

    #[test]
    fn test_password_rules() {
        let user = NewUser { password: String::new(), ..valid_user() };
        assert_eq!(message(user.validate()), "Password is required");
        let user = NewUser { password: "12345".to_string(), ..valid_user() };
        assert_eq!(message(user.validate()), "Password must be at least 6 characters");
    }

    #[test]
    fn test_phone_rules() {
        let user = NewUser { phone: String::new(), ..valid_user() };
        assert_eq!(message(user.validate()), "Phone is required");
        let user = NewUser { phone: "08123".to_string(), ..valid_user() };
        assert_eq!(message(user.validate()), "Phone must be 10 digits");
        let user = NewUser { phone: "08123abcde".to_string(), ..valid_user() };
        assert_eq!(message(user.validate()), "Phone must be numeric");
    }

    #[test]
    fn test_required_identity_fields() {
        let user = NewUser { id_number: " ".to_string(), ..valid_user() };
        assert_eq!(message(user.validate()), "ID number is required");
        let user = NewUser { id_doc_type: String::new(), ..valid_user() };
        assert_eq!(message(user.validate()), "ID doc type is required");
        let user = NewUser { birthday: None, ..valid_user() };
        assert_eq!(message(user.validate()), "Birthday is required");
        let user = NewUser { pdpa_consent: false, ..valid_user() };
        assert_eq!(message(user.validate()), "PDPA consent is required");
        let user = NewUser { account_type_id: None, ..valid_user() };
        assert_eq!(message(user.validate()), "Account type is required");
    }

    #[test]
    fn test_profile_image_must_be_url() {
        let user = NewUser { profile_image_url: "not a url".to_string(), ..valid_user() };
        assert_eq!(message(user.validate()), "Profile image must be a valid URL");
        let user = NewUser { profile_image_url: "/uploads/1.png".to_string(), ..valid_user() };
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_partial_update_only_checks_present_fields() {
        assert!(UserUpdate::default().validate().is_ok());
        let update = UserUpdate { phone: Some("12".to_string()), ..Default::default() };
        assert_eq!(message(update.validate()), "Phone must be 10 digits");
    }

    #[test]
    fn test_account_type_roles() {
        assert_eq!(AccountType::from_id(1), Some(AccountType::Student));
        assert!(AccountType::Teacher.is_reviewer());
        assert!(AccountType::Admin.is_reviewer());
        assert!(!AccountType::Student.is_reviewer());
        assert_eq!(AccountType::from_id(9), None);
    }

    #[test]
    fn test_self_update_and_profile_image_validation() {
        assert!(SelfUpdate::default().validate().is_ok());
        let bad_email = SelfUpdate { email: Some("nope".to_string()), ..Default::default() };
        assert_eq!(message(bad_email.validate()), "Email is invalid");

        let image = |url: &str| ProfileImageUpdate { profile_image_url: url.to_string() };
        assert!(image("").validate().is_ok());
        assert!(image("/uploads/me.png").validate().is_ok());
        assert_eq!(message(image("not a url").validate()), "Profile image must be a valid URL");
    }
}
