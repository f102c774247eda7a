//! Admin maintenance of the education reference tables.

use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::{map_constraint, ServiceError};
use crate::models::education::{CurriculumType, EducationLevel, ReferenceInput, School, SchoolType};
use crate::models::validation::invalid;
use crate::services::education::{get_level, get_school};

const NAME_TAKEN: &str = "name already exists";

fn ensure_affected(affected: usize, what: &str) -> Result<(), ServiceError> {
    if affected == 0 {
        return Err(ServiceError::not_found(format!("{} not found", what)));
    }
    Ok(())
}

fn replace_allowances(conn: &Connection, level_id: i64, school_type_ids: &[i64]) -> Result<(), ServiceError> {
    conn.execute(
        "DELETE FROM education_level_school_types WHERE education_level_id = ?1",
        params![level_id],
    )?;
    for type_id in school_type_ids {
        conn.execute(
            "INSERT OR IGNORE INTO education_level_school_types (education_level_id, school_type_id) VALUES (?1, ?2)",
            params![level_id, type_id],
        )
        .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    }
    Ok(())
}

pub fn create_level(conn: &mut Connection, input: &ReferenceInput) -> Result<EducationLevel, ServiceError> {
    let name = input.validated_name(100)?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO education_levels (name, project_based_applicable) VALUES (?1, ?2)",
        params![name, input.project_based_applicable.unwrap_or(true)],
    )
    .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    let id = tx.last_insert_rowid();
    if let Some(types) = &input.school_type_ids {
        replace_allowances(&tx, id, types)?;
    }
    tx.commit()?;
    info!("Created education level {}", id);
    get_level(conn, id)?.ok_or_else(|| ServiceError::not_found("Education level not found"))
}

pub fn update_level(conn: &mut Connection, id: i64, input: &ReferenceInput) -> Result<EducationLevel, ServiceError> {
    let name = input.validated_name(100)?;
    let existing = get_level(conn, id)?.ok_or_else(|| ServiceError::not_found("Education level not found"))?;
    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE education_levels SET name = ?1, project_based_applicable = ?2 WHERE id = ?3",
        params![name, input.project_based_applicable.unwrap_or(existing.project_based_applicable), id],
    )
    .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    if let Some(types) = &input.school_type_ids {
        replace_allowances(&tx, id, types)?;
    }
    tx.commit()?;
    get_level(conn, id)?.ok_or_else(|| ServiceError::not_found("Education level not found"))
}

pub fn delete_level(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn
        .execute("DELETE FROM education_levels WHERE id = ?1", params![id])
        .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    ensure_affected(affected, "Education level")
}

fn get_school_type(conn: &Connection, id: i64) -> Result<SchoolType, ServiceError> {
    conn.query_row("SELECT id, name FROM school_types WHERE id = ?1", params![id], |row| {
        Ok(SchoolType { id: row.get(0)?, name: row.get(1)? })
    })
    .optional()?
    .ok_or_else(|| ServiceError::not_found("School type not found"))
}

pub fn create_school_type(conn: &Connection, input: &ReferenceInput) -> Result<SchoolType, ServiceError> {
    let name = input.validated_name(100)?;
    conn.execute("INSERT INTO school_types (name) VALUES (?1)", params![name])
        .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    get_school_type(conn, conn.last_insert_rowid())
}

pub fn update_school_type(conn: &Connection, id: i64, input: &ReferenceInput) -> Result<SchoolType, ServiceError> {
    let name = input.validated_name(100)?;
    let affected = conn
        .execute("UPDATE school_types SET name = ?1 WHERE id = ?2", params![name, id])
        .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    ensure_affected(affected, "School type")?;
    get_school_type(conn, id)
}

pub fn delete_school_type(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn
        .execute("DELETE FROM school_types WHERE id = ?1", params![id])
        .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    ensure_affected(affected, "School type")
}

fn get_curriculum_type(conn: &Connection, id: i64) -> Result<CurriculumType, ServiceError> {
    conn.query_row(
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
    .optional()?
    .ok_or_else(|| ServiceError::not_found("Curriculum type not found"))
}

pub fn create_curriculum_type(conn: &Connection, input: &ReferenceInput) -> Result<CurriculumType, ServiceError> {
    let name = input.validated_name(150)?;
    conn.execute(
        "INSERT INTO curriculum_types (name, school_type_id) VALUES (?1, ?2)",
        params![name, input.school_type_id.filter(|id| *id > 0)],
    )
    .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    get_curriculum_type(conn, conn.last_insert_rowid())
}

pub fn update_curriculum_type(conn: &Connection, id: i64, input: &ReferenceInput) -> Result<CurriculumType, ServiceError> {
    let name = input.validated_name(150)?;
    let affected = conn
        .execute(
            "UPDATE curriculum_types SET name = ?1, school_type_id = ?2 WHERE id = ?3",
            params![name, input.school_type_id.filter(|id| *id > 0), id],
        )
        .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    ensure_affected(affected, "Curriculum type")?;
    get_curriculum_type(conn, id)
}

pub fn delete_curriculum_type(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn
        .execute("DELETE FROM curriculum_types WHERE id = ?1", params![id])
        .map_err(|e| map_constraint(e, NAME_TAKEN))?;
    ensure_affected(affected, "Curriculum type")
}

fn school_type_id(input: &ReferenceInput) -> Result<i64, ServiceError> {
    match input.school_type_id.filter(|id| *id > 0) {
        Some(id) => Ok(id),
        None => invalid("School type is required"),
    }
}

fn school_code(input: &ReferenceInput) -> Option<String> {
    input
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

pub fn create_school(conn: &Connection, input: &ReferenceInput) -> Result<School, ServiceError> {
    let name = input.validated_name(255)?;
    let type_id = school_type_id(input)?;
    conn.execute(
        "INSERT INTO schools (code, name, school_type_id, is_project_based) VALUES (?1, ?2, ?3, ?4)",
        params![school_code(input), name, type_id, input.is_project_based.unwrap_or(false)],
    )
    .map_err(|e| map_constraint(e, "school code already exists"))?;
    get_school(conn, conn.last_insert_rowid())?.ok_or_else(|| ServiceError::not_found("School not found"))
}

pub fn update_school(conn: &Connection, id: i64, input: &ReferenceInput) -> Result<School, ServiceError> {
    let name = input.validated_name(255)?;
    let type_id = school_type_id(input)?;
    let affected = conn
        .execute(
            "UPDATE schools SET code = ?1, name = ?2, school_type_id = ?3, is_project_based = ?4 WHERE id = ?5",
            params![school_code(input), name, type_id, input.is_project_based.unwrap_or(false), id],
        )
        .map_err(|e| map_constraint(e, "school code already exists"))?;
    ensure_affected(affected, "School")?;
    get_school(conn, id)?.ok_or_else(|| ServiceError::not_found("School not found"))
}

pub fn delete_school(conn: &Connection, id: i64) -> Result<(), ServiceError> {
    let affected = conn
        .execute("DELETE FROM schools WHERE id = ?1", params![id])
        .map_err(|e| map_constraint(e, "school code already exists"))?;
    ensure_affected(affected, "School")
}
