use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::ServiceError;
use crate::db::now;
use crate::models::review::{Feedback, FeedbackInput, FeedbackUpdate};
use crate::models::validation::invalid;
use crate::services::submissions::current_version;

const NOT_FOUND: &str = "Feedback not found";
const COLUMNS: &str =
    "id, overall_comment, strengths, areas_for_improvement, portfolio_submission_id, user_id, created_at, updated_at";

fn feedback_from_row(row: &Row) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get(0)?,
        overall_comment: row.get(1)?,
        strengths: row.get(2)?,
        areas_for_improvement: row.get(3)?,
        portfolio_submission_id: row.get(4)?,
        user_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Store reviewer feedback; runs inside the caller's transaction when there is one
pub(crate) fn insert_feedback(
    conn: &Connection,
    reviewer_id: i64,
    submission_id: i64,
    content: &FeedbackUpdate,
) -> Result<i64, ServiceError> {
    if current_version(conn, submission_id)?.is_none() {
        return Err(ServiceError::not_found("Portfolio submission not found"));
    }
    let timestamp = now();
    conn.execute(
        "INSERT INTO feedbacks (overall_comment, strengths, areas_for_improvement, portfolio_submission_id, user_id,
                                created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            content.overall_comment.trim(),
            content.strengths.trim(),
            content.areas_for_improvement.trim(),
            submission_id,
            reviewer_id,
            timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_feedback(conn: &Connection, reviewer_id: i64, input: &FeedbackInput) -> Result<Feedback, ServiceError> {
    let submission_id = match input.portfolio_submission_id.filter(|id| *id > 0) {
        Some(id) => id,
        None => return invalid("portfolio submission ID is required"),
    };
    let content = FeedbackUpdate {
        overall_comment: input.overall_comment.clone(),
        strengths: input.strengths.clone(),
        areas_for_improvement: input.areas_for_improvement.clone(),
    };
    let id = insert_feedback(conn, reviewer_id, submission_id, &content)?;
    get_feedback(conn, id)
}

pub fn get_feedback(conn: &Connection, id: i64) -> Result<Feedback, ServiceError> {
    conn.query_row(
        &format!("SELECT {} FROM feedbacks WHERE id = ?1", COLUMNS),
        params![id],
        feedback_from_row,
    )
    .optional()?
    .ok_or_else(|| ServiceError::not_found(NOT_FOUND))
}

pub fn list_feedback(conn: &Connection) -> Result<Vec<Feedback>, ServiceError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM feedbacks ORDER BY created_at DESC, id DESC", COLUMNS))?;
    let feedback = stmt.query_map([], feedback_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(feedback)
}

pub fn latest_for_submission(conn: &Connection, submission_id: i64) -> Result<Option<Feedback>, ServiceError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM feedbacks WHERE portfolio_submission_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                COLUMNS
            ),
            params![submission_id],
            feedback_from_row,
        )
        .optional()?)
}

pub fn update_feedback(conn: &Connection, id: i64, update: &FeedbackUpdate) -> Result<Feedback, ServiceError> {
    let affected = conn.execute(
        "UPDATE feedbacks SET overall_comment = ?1, strengths = ?2, areas_for_improvement = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            update.overall_comment.trim(),
            update.strengths.trim(),
            update.areas_for_improvement.trim(),
            now(),
            id,
        ],
    )?;
    if affected == 0 {
        return Err(ServiceError::not_found(NOT_FOUND));
    }
    get_feedback(conn, id)
}
