use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::{map_constraint, ServiceError};
use crate::db::now;
use crate::models::education::{
    CurriculumType, EducationInfo, EducationInput, EducationLevel, EducationStatus, School, SchoolType,
};
use crate::models::validation::invalid;

pub fn get_level(conn: &Connection, id: i64) -> Result<Option<EducationLevel>, ServiceError> {
    Ok(conn
        .query_row(
            "SELECT id, name, project_based_applicable FROM education_levels WHERE id = ?1",
            params![id],
            |row| {
                Ok(EducationLevel {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    project_based_applicable: row.get(2)?,
                })
            },
        )
        .optional()?)
}

pub fn get_school(conn: &Connection, id: i64) -> Result<Option<School>, ServiceError> {
    Ok(conn
        .query_row(
            "SELECT id, code, name, school_type_id, is_project_based FROM schools WHERE id = ?1",
            params![id],
            school_from_row,
        )
        .optional()?)
}

pub(crate) fn school_from_row(row: &Row) -> rusqlite::Result<School> {
    Ok(School {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        school_type_id: row.get(3)?,
        is_project_based: row.get(4)?,
    })
}

/// School types allowed for a level; empty when the level places no restriction
pub fn allowed_school_types(conn: &Connection, level_id: i64) -> Result<Vec<i64>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT school_type_id FROM education_level_school_types
         WHERE education_level_id = ?1 ORDER BY school_type_id",
    )?;
    let ids = stmt
        .query_map(params![level_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn school_type_exists(conn: &Connection, id: i64) -> Result<bool, ServiceError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM school_types WHERE id = ?1", params![id], |row| row.get(0))?;
    Ok(count > 0)
}

fn get_curriculum(conn: &Connection, id: i64) -> Result<Option<CurriculumType>, ServiceError> {
    Ok(conn
        .query_row(
            "SELECT id, name, school_type_id FROM curriculum_types WHERE id = ?1",
            params![id],
            |row| {
                Ok(CurriculumType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    school_type_id: row.get(2)?,
                })
            },
        )
        .optional()?)
}

/// Row values after the onboarding cascade has been applied
struct ResolvedEducation {
    school_id: Option<i64>,
    school_name: String,
    school_type_id: i64,
    is_project_based: Option<bool>,
}

/// Apply the level -> school -> school type -> curriculum cascade
fn resolve(conn: &Connection, input: &EducationInput) -> Result<ResolvedEducation, ServiceError> {
    let level_id = input.education_level_id.unwrap_or(0);
    let level = get_level(conn, level_id)?.ok_or_else(|| ServiceError::validation("Education level not found"))?;

    let mut resolved = match input.school_id.filter(|id| *id > 0) {
        Some(school_id) => {
            let school = get_school(conn, school_id)?.ok_or_else(|| ServiceError::validation("School not found"))?;
            ResolvedEducation {
                school_id: Some(school.id),
                school_name: school.name,
                school_type_id: school.school_type_id,
                is_project_based: Some(school.is_project_based),
            }
        }
        None => {
            let name = input.school_name.as_deref().map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return invalid("School name is required");
            }
            let school_type_id = match input.school_type_id.filter(|id| *id > 0) {
                Some(id) => id,
                None => return invalid("School type is required"),
            };
            if !school_type_exists(conn, school_type_id)? {
                return invalid("School type not found");
            }
            ResolvedEducation {
                school_id: None,
                school_name: name.to_string(),
                school_type_id,
                is_project_based: input.is_project_based,
            }
        }
    };

    let allowed = allowed_school_types(conn, level.id)?;
    if !allowed.is_empty() && !allowed.contains(&resolved.school_type_id) {
        return invalid("School type is not allowed for this education level");
    }

    if !level.project_based_applicable {
        resolved.is_project_based = None;
    }

    if let Some(curriculum_id) = input.curriculum_type_id.filter(|id| *id > 0) {
        let curriculum =
            get_curriculum(conn, curriculum_id)?.ok_or_else(|| ServiceError::validation("Curriculum type not found"))?;
        if let Some(type_id) = curriculum.school_type_id {
            if type_id != resolved.school_type_id {
                return invalid("Curriculum type does not match school type");
            }
        }
    }

    Ok(resolved)
}

const INFO_SELECT: &str = "SELECT e.id, e.user_id, e.education_level_id, l.name, e.school_id, e.school_name,
        e.school_type_id, t.name, e.curriculum_type_id, c.name, e.is_project_based, e.status,
        e.start_date, e.end_date, e.graduation_year, e.created_at, e.updated_at
     FROM education_infos e
     LEFT JOIN education_levels l ON l.id = e.education_level_id
     LEFT JOIN school_types t ON t.id = e.school_type_id
     LEFT JOIN curriculum_types c ON c.id = e.curriculum_type_id";

fn info_from_row(row: &Row) -> rusqlite::Result<EducationInfo> {
    Ok(EducationInfo {
        id: row.get(0)?,
        user_id: row.get(1)?,
        education_level_id: row.get(2)?,
        education_level_name: row.get(3)?,
        school_id: row.get(4)?,
        school_name: row.get(5)?,
        school_type_id: row.get(6)?,
        school_type_name: row.get(7)?,
        curriculum_type_id: row.get(8)?,
        curriculum_type_name: row.get(9)?,
        is_project_based: row.get(10)?,
        status: row.get(11)?,
        start_date: row.get(12)?,
        end_date: row.get(13)?,
        graduation_year: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

pub fn get_education(conn: &Connection, user_id: i64) -> Result<Option<EducationInfo>, ServiceError> {
    Ok(conn
        .query_row(&format!("{} WHERE e.user_id = ?1", INFO_SELECT), params![user_id], info_from_row)
        .optional()?)
}

/// Create or replace the education record of a user
pub fn upsert_education(conn: &Connection, user_id: i64, input: &EducationInput) -> Result<EducationInfo, ServiceError> {
    input.validate(user_id)?;
    let resolved = resolve(conn, input)?;
    let status = input
        .status
        .as_deref()
        .and_then(|s| EducationStatus::parse(s.trim()))
        .unwrap_or(EducationStatus::Current);
    let timestamp = now();

    conn.execute(
        "INSERT INTO education_infos (user_id, education_level_id, school_id, school_name, school_type_id,
                                      curriculum_type_id, is_project_based, status, start_date, end_date,
                                      graduation_year, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
         ON CONFLICT(user_id) DO UPDATE SET
            education_level_id = excluded.education_level_id,
            school_id = excluded.school_id,
            school_name = excluded.school_name,
            school_type_id = excluded.school_type_id,
            curriculum_type_id = excluded.curriculum_type_id,
            is_project_based = excluded.is_project_based,
            status = excluded.status,
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            graduation_year = excluded.graduation_year,
            updated_at = excluded.updated_at",
        params![
            user_id,
            input.education_level_id,
            resolved.school_id,
            resolved.school_name,
            resolved.school_type_id,
            input.curriculum_type_id.filter(|id| *id > 0),
            resolved.is_project_based,
            status.as_str(),
            input.start_date,
            input.end_date,
            input.graduation_year,
            timestamp,
        ],
    )
    .map_err(|e| map_constraint(e, "education info already exists"))?;

    info!("Saved education info for user {}", user_id);
    get_education(conn, user_id)?.ok_or_else(|| ServiceError::Internal("education info vanished after save".into()))
}

// Reference lists

pub fn list_levels(conn: &Connection) -> Result<Vec<EducationLevel>, ServiceError> {
    let mut stmt = conn.prepare("SELECT id, name, project_based_applicable FROM education_levels ORDER BY id")?;
    let levels = stmt
        .query_map([], |row| {
            Ok(EducationLevel {
                id: row.get(0)?,
                name: row.get(1)?,
                project_based_applicable: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(levels)
}

/// School types, narrowed to the level's allowances when it has any
pub fn list_school_types(conn: &Connection, level_id: Option<i64>) -> Result<Vec<SchoolType>, ServiceError> {
    let allowed = match level_id {
        Some(id) => allowed_school_types(conn, id)?,
        None => Vec::new(),
    };
    let mut stmt = conn.prepare("SELECT id, name FROM school_types ORDER BY id")?;
    let types = stmt
        .query_map([], |row| Ok(SchoolType { id: row.get(0)?, name: row.get(1)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(types
        .into_iter()
        .filter(|t| allowed.is_empty() || allowed.contains(&t.id))
        .collect())
}

/// Curricula for a school type, including the type-agnostic ones
pub fn list_curriculum_types(conn: &Connection, school_type_id: Option<i64>) -> Result<Vec<CurriculumType>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, school_type_id FROM curriculum_types
         WHERE ?1 IS NULL OR school_type_id IS NULL OR school_type_id = ?1
         ORDER BY id",
    )?;
    let curricula = stmt
        .query_map(params![school_type_id], |row| {
            Ok(CurriculumType {
                id: row.get(0)?,
                name: row.get(1)?,
                school_type_id: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(curricula)
}

pub const DEFAULT_SCHOOL_LIMIT: i64 = 20;
pub const MAX_SCHOOL_LIMIT: i64 = 100;

/// Search schools by name or code substring
pub fn search_schools(
    conn: &Connection,
    query: Option<&str>,
    school_type_id: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<School>, ServiceError> {
    let limit = match limit {
        Some(l) if l >= 1 => l.min(MAX_SCHOOL_LIMIT),
        _ => DEFAULT_SCHOOL_LIMIT,
    };
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", q));
    let mut stmt = conn.prepare(
        "SELECT id, code, name, school_type_id, is_project_based FROM schools
         WHERE (?1 IS NULL OR name LIKE ?1 OR code LIKE ?1)
           AND (?2 IS NULL OR school_type_id = ?2)
         ORDER BY name LIMIT ?3",
    )?;
    let schools = stmt
        .query_map(params![pattern, school_type_id, limit], school_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(schools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::user::AccountType;
    use crate::services::users::fixtures::user;
    use chrono::NaiveDate;

    const HIGH_SCHOOL: i64 = 1;
    const VOCATIONAL: i64 = 2;
    const GED: i64 = 4;
    const PUBLIC_SCHOOL: i64 = 1;
    const INTERNATIONAL: i64 = 4;
    const VOCATIONAL_COLLEGE: i64 = 5;

    fn free_text(level: i64, school_type: i64) -> EducationInput {
        EducationInput {
            education_level_id: Some(level),
            school_name: Some("  Suranaree School ".to_string()),
            school_type_id: Some(school_type),
            is_project_based: Some(true),
            status: Some("current".to_string()),
            start_date: NaiveDate::from_ymd_opt(2023, 5, 16),
            ..Default::default()
        }
    }

    fn message<T: std::fmt::Debug>(result: Result<T, ServiceError>) -> String {
        match result {
            Err(ServiceError::ValidationError(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    fn add_school(conn: &Connection, name: &str, code: &str, school_type: i64, project_based: bool) -> i64 {
        conn.execute(
            "INSERT INTO schools (code, name, school_type_id, is_project_based) VALUES (?1, ?2, ?3, ?4)",
            params![code, name, school_type, project_based],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_free_text_school_is_saved_and_updated_in_place() {
        let conn = open_memory_database().unwrap();
        let student = user(&conn, "s@example.com", AccountType::Student);

        let saved = upsert_education(&conn, student.id, &free_text(HIGH_SCHOOL, PUBLIC_SCHOOL)).unwrap();
        assert_eq!(saved.school_name, "Suranaree School");
        assert_eq!(saved.is_project_based, Some(true));
        assert_eq!(saved.school_type_name.as_deref(), Some("โรงเรียนรัฐบาล"));

        let mut changed = free_text(HIGH_SCHOOL, PUBLIC_SCHOOL);
        changed.status = Some("graduated".to_string());
        changed.graduation_year = Some(2026);
        let updated = upsert_education(&conn, student.id, &changed).unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.status, "graduated");
    }

    #[test]
    fn test_selected_school_forces_type_and_name() {
        let conn = open_memory_database().unwrap();
        let student = user(&conn, "s@example.com", AccountType::Student);
        let school = add_school(&conn, "Demonstration School", "10001", 3, false);

        let input = EducationInput {
            school_id: Some(school),
            school_name: Some("typed by hand".to_string()),
            school_type_id: Some(PUBLIC_SCHOOL),
            is_project_based: Some(true),
            ..free_text(HIGH_SCHOOL, PUBLIC_SCHOOL)
        };
        let saved = upsert_education(&conn, student.id, &input).unwrap();
        assert_eq!(saved.school_id, Some(school));
        assert_eq!(saved.school_name, "Demonstration School");
        assert_eq!(saved.school_type_id, Some(3));
        assert_eq!(saved.is_project_based, Some(false));
    }

    #[test]
    fn test_cascade_rejections() {
        let conn = open_memory_database().unwrap();
        let student = user(&conn, "s@example.com", AccountType::Student);

        assert_eq!(message(upsert_education(&conn, student.id, &free_text(99, PUBLIC_SCHOOL))), "Education level not found");

        let missing_school = EducationInput { school_id: Some(999), ..free_text(HIGH_SCHOOL, PUBLIC_SCHOOL) };
        assert_eq!(message(upsert_education(&conn, student.id, &missing_school)), "School not found");

        let no_name = EducationInput { school_name: Some("  ".to_string()), ..free_text(HIGH_SCHOOL, PUBLIC_SCHOOL) };
        assert_eq!(message(upsert_education(&conn, student.id, &no_name)), "School name is required");

        let no_type = EducationInput { school_type_id: None, ..free_text(HIGH_SCHOOL, PUBLIC_SCHOOL) };
        assert_eq!(message(upsert_education(&conn, student.id, &no_type)), "School type is required");

        assert_eq!(
            message(upsert_education(&conn, student.id, &free_text(VOCATIONAL, PUBLIC_SCHOOL))),
            "School type is not allowed for this education level"
        );

        let wrong_curriculum = EducationInput { curriculum_type_id: Some(7), ..free_text(HIGH_SCHOOL, PUBLIC_SCHOOL) };
        assert_eq!(
            message(upsert_education(&conn, student.id, &wrong_curriculum)),
            "Curriculum type does not match school type"
        );
    }

    #[test]
    fn test_generic_curriculum_fits_any_school_type() {
        let conn = open_memory_database().unwrap();
        let student = user(&conn, "s@example.com", AccountType::Student);
        let input = EducationInput { curriculum_type_id: Some(1), ..free_text(VOCATIONAL, VOCATIONAL_COLLEGE) };
        let saved = upsert_education(&conn, student.id, &input).unwrap();
        assert_eq!(saved.curriculum_type_id, Some(1));
    }

    #[test]
    fn test_ged_never_stores_project_based() {
        let conn = open_memory_database().unwrap();
        let student = user(&conn, "s@example.com", AccountType::Student);
        let saved = upsert_education(&conn, student.id, &free_text(GED, INTERNATIONAL)).unwrap();
        assert_eq!(saved.is_project_based, None);
    }

    #[test]
    fn test_school_types_follow_level_allowances() {
        let conn = open_memory_database().unwrap();
        assert_eq!(list_school_types(&conn, None).unwrap().len(), 7);
        let vocational = list_school_types(&conn, Some(VOCATIONAL)).unwrap();
        assert_eq!(vocational.len(), 1);
        assert_eq!(vocational[0].id, VOCATIONAL_COLLEGE);
        assert_eq!(list_school_types(&conn, Some(GED)).unwrap().len(), 3);
    }

    #[test]
    fn test_curricula_include_type_agnostic() {
        let conn = open_memory_database().unwrap();
        let international = list_curriculum_types(&conn, Some(INTERNATIONAL)).unwrap();
        let names: Vec<_> = international.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["หลักสูตรแกนกลาง", "IB Diploma", "A-Level"]);
    }

    #[test]
    fn test_school_search_and_limit() {
        let conn = open_memory_database().unwrap();
        for i in 0..30 {
            add_school(&conn, &format!("Wittaya {}", i), &format!("C{:03}", i), PUBLIC_SCHOOL, false);
        }
        add_school(&conn, "Korat Technical College", "T001", VOCATIONAL_COLLEGE, true);

        assert_eq!(search_schools(&conn, None, None, None).unwrap().len(), 20);
        assert_eq!(search_schools(&conn, Some("wittaya"), None, Some(500)).unwrap().len(), 30);
        assert_eq!(search_schools(&conn, Some("T001"), None, None).unwrap().len(), 1);
        assert_eq!(search_schools(&conn, None, Some(VOCATIONAL_COLLEGE), None).unwrap().len(), 1);
    }
}
