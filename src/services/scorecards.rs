use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::ServiceError;
use crate::db::now;
use crate::models::review::{
    weighted_total, CriteriaInput, ScoreCriteria, Scorecard, ScorecardInput, ScorecardUpdate, SCORECARD_MAX_SCORE,
};
use crate::models::validation::invalid;
use crate::services::submissions::current_version;

const NOT_FOUND: &str = "Scorecard not found";
const COLUMNS: &str = "id, total_score, max_score, general_comment, submission_version, portfolio_submission_id, \
     user_id, created_at, updated_at";

fn scorecard_from_row(row: &Row) -> rusqlite::Result<Scorecard> {
    Ok(Scorecard {
        id: row.get(0)?,
        total_score: row.get(1)?,
        max_score: row.get(2)?,
        general_comment: row.get(3)?,
        submission_version: row.get(4)?,
        portfolio_submission_id: row.get(5)?,
        user_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        score_criteria: Vec::new(),
    })
}

fn load_criteria(conn: &Connection, scorecard_id: i64) -> Result<Vec<ScoreCriteria>, ServiceError> {
    let mut stmt = conn.prepare(
        "SELECT id, criteria_number, criteria_name, max_score, score, weight_percent, comment, order_index, scorecard_id
         FROM score_criteria WHERE scorecard_id = ?1 ORDER BY order_index, id",
    )?;
    let criteria = stmt
        .query_map(params![scorecard_id], |row| {
            Ok(ScoreCriteria {
                id: row.get(0)?,
                criteria_number: row.get(1)?,
                criteria_name: row.get(2)?,
                max_score: row.get(3)?,
                score: row.get(4)?,
                weight_percent: row.get(5)?,
                comment: row.get(6)?,
                order_index: row.get(7)?,
                scorecard_id: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(criteria)
}

fn with_criteria(conn: &Connection, mut scorecard: Scorecard) -> Result<Scorecard, ServiceError> {
    scorecard.score_criteria = load_criteria(conn, scorecard.id)?;
    Ok(scorecard)
}

fn insert_criterion(conn: &Connection, scorecard_id: i64, criterion: &CriteriaInput) -> Result<(), ServiceError> {
    conn.execute(
        "INSERT INTO score_criteria (criteria_number, criteria_name, max_score, score, weight_percent, comment,
                                     order_index, scorecard_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            criterion.criteria_number,
            criterion.criteria_name.trim(),
            criterion.max_score,
            criterion.score,
            criterion.weight_percent,
            criterion.comment.trim(),
            criterion.order_index,
            scorecard_id,
        ],
    )?;
    Ok(())
}

/// Store a scorecard for the submission's current version. Runs inside the caller's transaction.
pub(crate) fn insert_scorecard(
    conn: &Connection,
    reviewer_id: i64,
    submission_id: i64,
    general_comment: &str,
    criteria: &[CriteriaInput],
) -> Result<i64, ServiceError> {
    for criterion in criteria {
        criterion.validate()?;
    }
    let version = current_version(conn, submission_id)?
        .ok_or_else(|| ServiceError::not_found("Portfolio submission not found"))?;
    let total = weighted_total(criteria.iter().map(|c| (c.score, c.weight_percent)));
    let timestamp = now();

    conn.execute(
        "INSERT INTO scorecards (total_score, max_score, general_comment, submission_version, portfolio_submission_id,
                                 user_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![total, SCORECARD_MAX_SCORE, general_comment.trim(), version, submission_id, reviewer_id, timestamp],
    )?;
    let id = conn.last_insert_rowid();
    for criterion in criteria {
        insert_criterion(conn, id, criterion)?;
    }
    info!("Reviewer {} scored submission {} v{}: {:.2}", reviewer_id, submission_id, version, total);
    Ok(id)
}

pub fn create_scorecard(conn: &mut Connection, reviewer_id: i64, input: &ScorecardInput) -> Result<Scorecard, ServiceError> {
    let submission_id = match input.portfolio_submission_id.filter(|id| *id > 0) {
        Some(id) => id,
        None => return invalid("portfolio submission ID is required"),
    };
    let tx = conn.transaction()?;
    let id = insert_scorecard(&tx, reviewer_id, submission_id, &input.general_comment, &input.score_criteria)?;
    tx.commit()?;
    get_scorecard(conn, id)
}

/// Edit comment and criteria. New criteria are added, known ones updated, foreign ids ignored.
pub fn update_scorecard(conn: &mut Connection, id: i64, update: &ScorecardUpdate) -> Result<Scorecard, ServiceError> {
    for criterion in &update.score_criteria {
        criterion.validate()?;
    }
    let existing = get_scorecard(conn, id)?;
    let owned: Vec<i64> = existing.score_criteria.iter().map(|c| c.id).collect();

    let tx = conn.transaction()?;
    for criterion in &update.score_criteria {
        match criterion.id.filter(|id| *id > 0) {
            None => insert_criterion(&tx, id, criterion)?,
            Some(criterion_id) if owned.contains(&criterion_id) => {
                tx.execute(
                    "UPDATE score_criteria SET criteria_number = ?1, criteria_name = ?2, max_score = ?3, score = ?4,
                            weight_percent = ?5, comment = ?6, order_index = ?7
                     WHERE id = ?8",
                    params![
                        criterion.criteria_number,
                        criterion.criteria_name.trim(),
                        criterion.max_score,
                        criterion.score,
                        criterion.weight_percent,
                        criterion.comment.trim(),
                        criterion.order_index,
                        criterion_id,
                    ],
                )?;
            }
            Some(_) => {}
        }
    }

    let stored = load_criteria(&tx, id)?;
    let total = weighted_total(stored.iter().map(|c| (c.score, c.weight_percent)));
    tx.execute(
        "UPDATE scorecards SET general_comment = ?1, total_score = ?2, updated_at = ?3 WHERE id = ?4",
        params![update.general_comment.trim(), total, now(), id],
    )?;
    tx.commit()?;
    get_scorecard(conn, id)
}

pub fn get_scorecard(conn: &Connection, id: i64) -> Result<Scorecard, ServiceError> {
    let scorecard = conn
        .query_row(
            &format!("SELECT {} FROM scorecards WHERE id = ?1", COLUMNS),
            params![id],
            scorecard_from_row,
        )
        .optional()?
        .ok_or_else(|| ServiceError::not_found(NOT_FOUND))?;
    with_criteria(conn, scorecard)
}

pub fn list_scorecards(conn: &Connection) -> Result<Vec<Scorecard>, ServiceError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM scorecards ORDER BY created_at DESC, id DESC", COLUMNS))?;
    let rows = stmt.query_map([], scorecard_from_row)?.collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|s| with_criteria(conn, s)).collect()
}

pub fn latest_for_submission(conn: &Connection, submission_id: i64) -> Result<Option<Scorecard>, ServiceError> {
    let scorecard = conn
        .query_row(
            &format!(
                "SELECT {} FROM scorecards WHERE portfolio_submission_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                COLUMNS
            ),
            params![submission_id],
            scorecard_from_row,
        )
        .optional()?;
    scorecard.map(|s| with_criteria(conn, s)).transpose()
}

/// Whether the submission's current version has been scored
pub fn has_scorecard_for_version(conn: &Connection, submission_id: i64, version: i64) -> Result<bool, ServiceError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM scorecards WHERE portfolio_submission_id = ?1 AND submission_version = ?2",
        params![submission_id, version],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::services::submissions::fixtures::submitted;

    fn criterion(number: i64, score: f64, weight: f64) -> CriteriaInput {
        CriteriaInput {
            id: None,
            criteria_number: number,
            criteria_name: format!("Criterion {}", number),
            max_score: 100.0,
            score,
            weight_percent: weight,
            comment: String::new(),
            order_index: number,
        }
    }

    #[test]
    fn test_create_computes_weighted_total() {
        let (mut conn, submission, _) = submitted();
        let teacher = crate::services::users::fixtures::user(
            &conn,
            "t@example.com",
            crate::models::user::AccountType::Teacher,
        );
        let input = ScorecardInput {
            portfolio_submission_id: Some(submission.id),
            general_comment: "Solid".to_string(),
            score_criteria: vec![criterion(1, 80.0, 40.0), criterion(2, 90.0, 60.0)],
        };
        let scorecard = create_scorecard(&mut conn, teacher.id, &input).unwrap();
        assert!((scorecard.total_score - 86.0).abs() < 1e-9);
        assert_eq!(scorecard.max_score, 100.0);
        assert_eq!(scorecard.submission_version, 1);
        assert_eq!(scorecard.user_id, Some(teacher.id));
        assert_eq!(scorecard.score_criteria.len(), 2);
        assert!(has_scorecard_for_version(&conn, submission.id, 1).unwrap());
        assert!(!has_scorecard_for_version(&conn, submission.id, 2).unwrap());
    }

    #[test]
    fn test_invalid_criterion_stores_nothing() {
        let (mut conn, submission, owner) = submitted();
        let input = ScorecardInput {
            portfolio_submission_id: Some(submission.id),
            general_comment: String::new(),
            score_criteria: vec![criterion(1, 80.0, 40.0), criterion(2, 120.0, 60.0)],
        };
        assert!(matches!(create_scorecard(&mut conn, owner, &input), Err(ServiceError::ValidationError(_))));
        assert!(list_scorecards(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_missing_submission() {
        let (mut conn, _, owner) = submitted();
        let input = ScorecardInput { portfolio_submission_id: Some(999), ..Default::default() };
        assert!(matches!(create_scorecard(&mut conn, owner, &input), Err(ServiceError::NotFound(_))));

        let input = ScorecardInput::default();
        assert!(matches!(create_scorecard(&mut conn, owner, &input), Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn test_update_upserts_criteria_and_recomputes() {
        let (mut conn, submission, owner) = submitted();
        let input = ScorecardInput {
            portfolio_submission_id: Some(submission.id),
            general_comment: "First pass".to_string(),
            score_criteria: vec![criterion(1, 50.0, 50.0)],
        };
        let created = create_scorecard(&mut conn, owner, &input).unwrap();
        let existing_id = created.score_criteria[0].id;

        let update = ScorecardUpdate {
            general_comment: "Second pass".to_string(),
            score_criteria: vec![
                CriteriaInput { id: Some(existing_id), ..criterion(1, 100.0, 50.0) },
                criterion(2, 60.0, 50.0),
                CriteriaInput { id: Some(9999), ..criterion(3, 100.0, 100.0) },
            ],
        };
        let updated = update_scorecard(&mut conn, created.id, &update).unwrap();
        assert_eq!(updated.general_comment, "Second pass");
        assert_eq!(updated.score_criteria.len(), 2);
        assert!((updated.total_score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_latest_for_submission() {
        let (mut conn, submission, owner) = submitted();
        assert!(latest_for_submission(&conn, submission.id).unwrap().is_none());
        for comment in ["one", "two"] {
            let input = ScorecardInput {
                portfolio_submission_id: Some(submission.id),
                general_comment: comment.to_string(),
                score_criteria: Vec::new(),
            };
            create_scorecard(&mut conn, owner, &input).unwrap();
        }
        assert_eq!(latest_for_submission(&conn, submission.id).unwrap().unwrap().general_comment, "two");
    }
}
