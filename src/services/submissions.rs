use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::ServiceError;
use crate::core::notifier::NotificationHub;
use crate::db::now;
use crate::models::announcement::{Notification, NotificationInput};
use crate::models::review::{
    validate_version, ApprovalInput, PortfolioSubmission, SubmissionStatus, MAX_SUBMISSION_VERSION,
};
use crate::models::user::{AccountType, User};
use crate::services::feedback::insert_feedback;
use crate::services::notifications;
use crate::services::portfolios::portfolio_owner;
use crate::services::scorecards::{has_scorecard_for_version, insert_scorecard};

const NOT_FOUND: &str = "Portfolio submission not found";
pub const STATUS_NOTIFICATION_TYPE: &str = "submission_status";

const SELECT: &str = "SELECT s.id, s.version, s.status, s.submission_at, s.reviewed_at, s.approved_at,
        s.portfolio_id, p.portfolio_name, s.user_id, NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''),
        s.created_at, s.updated_at
     FROM portfolio_submissions s
     LEFT JOIN portfolios p ON p.id = s.portfolio_id
     LEFT JOIN users u ON u.id = s.user_id";

fn submission_from_row(row: &Row) -> rusqlite::Result<PortfolioSubmission> {
    Ok(PortfolioSubmission {
        id: row.get(0)?,
        version: row.get(1)?,
        status: row.get(2)?,
        submission_at: row.get(3)?,
        reviewed_at: row.get(4)?,
        approved_at: row.get(5)?,
        portfolio_id: row.get(6)?,
        portfolio_name: row.get(7)?,
        user_id: row.get(8)?,
        student_name: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn query(conn: &Connection, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<PortfolioSubmission>, ServiceError> {
    let mut stmt = conn.prepare(&format!("{} {}", SELECT, filter))?;
    let rows = stmt
        .query_map(args, submission_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn find(conn: &Connection, id: i64) -> Result<Option<PortfolioSubmission>, ServiceError> {
    Ok(conn
        .query_row(&format!("{} WHERE s.id = ?1", SELECT), params![id], submission_from_row)
        .optional()?)
}

/// Version currently under review, if the submission exists
pub fn current_version(conn: &Connection, id: i64) -> Result<Option<i64>, ServiceError> {
    Ok(conn
        .query_row("SELECT version FROM portfolio_submissions WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?)
}

pub fn get_submission(conn: &Connection, id: i64) -> Result<PortfolioSubmission, ServiceError> {
    find(conn, id)?.ok_or_else(|| ServiceError::not_found(NOT_FOUND))
}

/// Submission visible to the viewer: reviewers see all, students their own
pub fn get_visible(conn: &Connection, id: i64, viewer: &User) -> Result<PortfolioSubmission, ServiceError> {
    let submission = get_submission(conn, id)?;
    let reviewer = viewer.account_type().map_or(false, AccountType::is_reviewer);
    if reviewer || submission.user_id == viewer.id {
        Ok(submission)
    } else {
        Err(ServiceError::not_found(NOT_FOUND))
    }
}

/// Submit a portfolio for review, or resubmit it as the next version
pub fn submit(conn: &mut Connection, user_id: i64, portfolio_id: i64) -> Result<PortfolioSubmission, ServiceError> {
    if portfolio_owner(conn, portfolio_id)? != Some(user_id) {
        return Err(ServiceError::not_found("Portfolio not found"));
    }

    let tx = conn.transaction()?;
    let latest: Option<(i64, i64, String)> = tx
        .query_row(
            "SELECT id, version, status FROM portfolio_submissions WHERE portfolio_id = ?1 AND user_id = ?2
             ORDER BY id DESC LIMIT 1",
            params![portfolio_id, user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let timestamp = now();

    let id = match latest {
        None => {
            tx.execute(
                "INSERT INTO portfolio_submissions (version, status, submission_at, portfolio_id, user_id, created_at, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?2, ?2)",
                params![SubmissionStatus::AwaitingReview.as_str(), timestamp, portfolio_id, user_id],
            )?;
            tx.last_insert_rowid()
        }
        Some((id, version, status)) => {
            SubmissionStatus::parse(&status)
                .ok_or_else(|| ServiceError::Internal(format!("unknown stored status {}", status)))?
                .resubmit()?;
            let next = version + 1;
            validate_version(next)?;
            tx.execute(
                "UPDATE portfolio_submissions
                 SET version = ?1, status = ?2, submission_at = ?3, reviewed_at = NULL, approved_at = NULL, updated_at = ?3
                 WHERE id = ?4",
                params![next, SubmissionStatus::AwaitingReview.as_str(), timestamp, id],
            )?;
            id
        }
    };
    tx.commit()?;

    let submission = get_submission(conn, id)?;
    info!(
        "User {} submitted portfolio {} (submission {} v{})",
        user_id, portfolio_id, submission.id, submission.version
    );
    Ok(submission)
}

fn status_notification(submission: &PortfolioSubmission, status: SubmissionStatus) -> NotificationInput {
    let portfolio = submission.portfolio_name.as_deref().unwrap_or("แฟ้มสะสมผลงาน");
    NotificationInput {
        notification_title: "อัปเดตสถานะการตรวจผลงาน".to_string(),
        notification_message: format!("{} (ฉบับที่ {}) : {}", portfolio, submission.version, status.label()),
        notification_type: STATUS_NOTIFICATION_TYPE.to_string(),
        announcement_id: None,
    }
}

/// Apply a reviewer transition inside an open transaction; returns the student's notification
fn apply_transition(
    conn: &Connection,
    submission: &PortfolioSubmission,
    next: SubmissionStatus,
) -> Result<Notification, ServiceError> {
    let current = SubmissionStatus::parse(&submission.status)
        .ok_or_else(|| ServiceError::Internal(format!("unknown stored status {}", submission.status)))?;
    current.transition(next)?;
    if next == SubmissionStatus::Approved && !has_scorecard_for_version(conn, submission.id, submission.version)? {
        return Err(ServiceError::validation("cannot approve without scorecard"));
    }

    let timestamp = now();
    match next {
        SubmissionStatus::Reviewed | SubmissionStatus::RevisionRequested => {
            conn.execute(
                "UPDATE portfolio_submissions SET status = ?1, reviewed_at = ?2, updated_at = ?2 WHERE id = ?3",
                params![next.as_str(), timestamp, submission.id],
            )?;
        }
        SubmissionStatus::Approved => {
            conn.execute(
                "UPDATE portfolio_submissions
                 SET status = ?1, approved_at = ?2, reviewed_at = COALESCE(reviewed_at, ?2), updated_at = ?2
                 WHERE id = ?3",
                params![next.as_str(), timestamp, submission.id],
            )?;
        }
        _ => {
            conn.execute(
                "UPDATE portfolio_submissions SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![next.as_str(), timestamp, submission.id],
            )?;
        }
    }

    notifications::insert(conn, submission.user_id, &status_notification(submission, next))
}

/// Move a submission to a new review status and tell the student
pub fn change_status(
    conn: &mut Connection,
    hub: &NotificationHub,
    id: i64,
    next: SubmissionStatus,
) -> Result<PortfolioSubmission, ServiceError> {
    let submission = get_submission(conn, id)?;
    let tx = conn.transaction()?;
    let notification = apply_transition(&tx, &submission, next)?;
    tx.commit()?;

    notifications::push(hub, &notification);
    info!("Submission {} moved from {} to {}", id, submission.status, next.as_str());
    get_submission(conn, id)
}

pub fn mark_reviewed(conn: &mut Connection, hub: &NotificationHub, id: i64) -> Result<PortfolioSubmission, ServiceError> {
    change_status(conn, hub, id, SubmissionStatus::Reviewed)
}

pub fn approve(conn: &mut Connection, hub: &NotificationHub, id: i64) -> Result<PortfolioSubmission, ServiceError> {
    change_status(conn, hub, id, SubmissionStatus::Approved)
}

/// Score, optionally comment on, and approve a submission atomically
pub fn approve_with_scorecard(
    conn: &mut Connection,
    hub: &NotificationHub,
    reviewer_id: i64,
    id: i64,
    input: &ApprovalInput,
) -> Result<PortfolioSubmission, ServiceError> {
    let submission = get_submission(conn, id)?;
    SubmissionStatus::parse(&submission.status)
        .ok_or_else(|| ServiceError::Internal(format!("unknown stored status {}", submission.status)))?
        .transition(SubmissionStatus::Approved)?;

    let tx = conn.transaction()?;
    insert_scorecard(&tx, reviewer_id, id, &input.general_comment, &input.score_criteria)?;
    if let Some(feedback) = &input.feedback {
        insert_feedback(&tx, reviewer_id, id, feedback)?;
    }
    let notification = apply_transition(&tx, &submission, SubmissionStatus::Approved)?;
    tx.commit()?;

    notifications::push(hub, &notification);
    info!("Reviewer {} approved submission {} with scorecard", reviewer_id, id);
    get_submission(conn, id)
}

pub fn list_all(conn: &Connection) -> Result<Vec<PortfolioSubmission>, ServiceError> {
    query(conn, "ORDER BY s.submission_at DESC, s.id DESC", &[])
}

pub fn list_by_status(conn: &Connection, status: SubmissionStatus) -> Result<Vec<PortfolioSubmission>, ServiceError> {
    query(conn, "WHERE s.status = ?1 ORDER BY s.submission_at DESC, s.id DESC", &[&status.as_str()])
}

pub fn list_pending(conn: &Connection) -> Result<Vec<PortfolioSubmission>, ServiceError> {
    list_by_status(conn, SubmissionStatus::AwaitingReview)
}

pub fn list_by_portfolio(conn: &Connection, portfolio_id: i64) -> Result<Vec<PortfolioSubmission>, ServiceError> {
    query(conn, "WHERE s.portfolio_id = ?1 ORDER BY s.submission_at DESC, s.id DESC", &[&portfolio_id])
}

pub fn list_for_user(conn: &Connection, user_id: i64) -> Result<Vec<PortfolioSubmission>, ServiceError> {
    query(conn, "WHERE s.user_id = ?1 ORDER BY s.submission_at DESC, s.id DESC", &[&user_id])
}

/// Admins may delete any submission; students may withdraw their own while it awaits review
pub fn delete_submission(conn: &Connection, caller: &User, id: i64) -> Result<(), ServiceError> {
    let submission = get_submission(conn, id)?;
    match caller.account_type() {
        Some(AccountType::Admin) => {}
        _ if submission.user_id == caller.id => {
            if submission.status != SubmissionStatus::AwaitingReview.as_str() {
                return Err(ServiceError::conflict("only submissions awaiting review can be withdrawn"));
            }
        }
        _ => return Err(ServiceError::not_found(NOT_FOUND)),
    }
    conn.execute("DELETE FROM portfolio_submissions WHERE id = ?1", params![id])?;
    info!("User {} deleted submission {}", caller.id, id);
    Ok(())
}
