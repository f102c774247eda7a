use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::ServiceError;
use crate::models::validation::{char_len, invalid};

/// Where a student is in their studies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EducationStatus {
    Current,
    Graduated,
    Other,
}

impl EducationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "current" => Some(EducationStatus::Current),
            "graduated" => Some(EducationStatus::Graduated),
            "other" => Some(EducationStatus::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EducationStatus::Current => "current",
            EducationStatus::Graduated => "graduated",
            EducationStatus::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EducationLevel {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    /// False for levels such as GED where project-based study is not tracked
    pub project_based_applicable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchoolType {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurriculumType {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    /// None when the curriculum applies to any school type
    pub school_type_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct School {
    #[serde(rename = "ID")]
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub school_type_id: i64,
    pub is_project_based: bool,
}

/// Education record of a student, with reference names resolved
#[derive(Debug, Clone, Serialize)]
pub struct EducationInfo {
    #[serde(rename = "ID")]
    pub id: i64,
    pub user_id: i64,
    pub education_level_id: i64,
    pub education_level_name: Option<String>,
    pub school_id: Option<i64>,
    pub school_name: String,
    pub school_type_id: Option<i64>,
    pub school_type_name: Option<String>,
    pub curriculum_type_id: Option<i64>,
    pub curriculum_type_name: Option<String>,
    pub is_project_based: Option<bool>,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub graduation_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Education form as submitted during onboarding or profile edit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EducationInput {
    pub education_level_id: Option<i64>,
    pub school_id: Option<i64>,
    pub school_name: Option<String>,
    pub school_type_id: Option<i64>,
    pub curriculum_type_id: Option<i64>,
    pub is_project_based: Option<bool>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub graduation_year: Option<i32>,
}

impl EducationInput {
    /// Field-level checks that need no database lookups
    pub fn validate(&self, user_id: i64) -> Result<(), ServiceError> {
        if user_id <= 0 {
            return invalid("User ID is required");
        }
        if self.education_level_id.unwrap_or(0) <= 0 {
            return invalid("Education level is required");
        }
        match self.status.as_deref().map(str::trim) {
            None | Some("") => return invalid("Education status is required"),
            Some(status) if EducationStatus::parse(status).is_none() => {
                return invalid("Education status must be one of: current, graduated, other")
            }
            Some(_) => {}
        }
        let start = match self.start_date {
            Some(date) => date,
            None => return invalid("Start date is required"),
        };
        if let Some(end) = self.end_date {
            if end < start {
                return invalid("End date must be after start date");
            }
        }
        if let Some(year) = self.graduation_year {
            if !(1950..=2100).contains(&year) {
                return invalid("Graduation year is invalid");
            }
        }
        if let Some(name) = &self.school_name {
            if char_len(name.trim()) > 255 {
                return invalid("School name must not exceed 255 characters");
            }
        }
        Ok(())
    }
}

/// Reference row created or renamed by an admin
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceInput {
    #[serde(default)]
    pub name: String,
    pub code: Option<String>,
    pub school_type_id: Option<i64>,
    pub is_project_based: Option<bool>,
    pub project_based_applicable: Option<bool>,
    /// School types allowed for an education level
    pub school_type_ids: Option<Vec<i64>>,
}

impl ReferenceInput {
    pub fn validated_name(&self, max: usize) -> Result<String, ServiceError> {
        let name = self.name.trim();
        if name.is_empty() {
            return invalid("Name is required");
        }
        if char_len(name) > max {
            return invalid(format!("Name must not exceed {} characters", max));
        }
        Ok(name.to_string())
    }
}
