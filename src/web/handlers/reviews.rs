//! Scorecards and written feedback on submissions. Reviewers write and list them; students
//! may read the results attached to their own submissions.

use actix_web::{web, HttpResponse};
use rusqlite::Connection;

use crate::core::error::ServiceError;
use crate::models::review::{FeedbackInput, FeedbackUpdate, ScorecardInput, ScorecardUpdate};
use crate::services::{feedback, scorecards, submissions};
use crate::web::auth::AuthUser;
use crate::web::models::DataResponse;
use crate::web::server::AppState;

/// Reviewers pass; anyone else must own the submission. Foreign results read as `missing`.
fn ensure_result_visible(
    conn: &Connection,
    caller: &AuthUser,
    submission_id: i64,
    missing: &str,
) -> Result<(), ServiceError> {
    match submissions::get_visible(conn, submission_id, &caller.user) {
        Ok(_) => Ok(()),
        Err(ServiceError::NotFound(_)) => Err(ServiceError::not_found(missing)),
        Err(e) => Err(e),
    }
}

pub async fn create_scorecard(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ScorecardInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let mut conn = data.db.lock().await;
    let scorecard = scorecards::create_scorecard(&mut conn, caller.id(), &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(scorecard)))
}

pub async fn list_scorecards(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(scorecards::list_scorecards(&conn)?)))
}

pub async fn get_scorecard(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let scorecard = scorecards::get_scorecard(&conn, id.into_inner())?;
    ensure_result_visible(&conn, &caller, scorecard.portfolio_submission_id, "Scorecard not found")?;
    Ok(HttpResponse::Ok().json(DataResponse::new(scorecard)))
}

pub async fn latest_scorecard(
    data: web::Data<AppState>,
    caller: AuthUser,
    submission_id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let submission_id = submission_id.into_inner();
    let conn = data.db.lock().await;
    ensure_result_visible(&conn, &caller, submission_id, "Scorecard not found")?;
    let scorecard = scorecards::latest_for_submission(&conn, submission_id)?
        .ok_or_else(|| ServiceError::not_found("Scorecard not found"))?;
    Ok(HttpResponse::Ok().json(DataResponse::new(scorecard)))
}

pub async fn update_scorecard(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<ScorecardUpdate>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let mut conn = data.db.lock().await;
    let scorecard = scorecards::update_scorecard(&mut conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(scorecard)))
}

pub async fn create_feedback(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<FeedbackInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let conn = data.db.lock().await;
    let created = feedback::create_feedback(&conn, caller.id(), &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(created)))
}

pub async fn list_feedback(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(feedback::list_feedback(&conn)?)))
}

pub async fn get_feedback(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let found = feedback::get_feedback(&conn, id.into_inner())?;
    ensure_result_visible(&conn, &caller, found.portfolio_submission_id, "Feedback not found")?;
    Ok(HttpResponse::Ok().json(DataResponse::new(found)))
}

pub async fn latest_feedback(
    data: web::Data<AppState>,
    caller: AuthUser,
    submission_id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let submission_id = submission_id.into_inner();
    let conn = data.db.lock().await;
    ensure_result_visible(&conn, &caller, submission_id, "Feedback not found")?;
    let latest = feedback::latest_for_submission(&conn, submission_id)?
        .ok_or_else(|| ServiceError::not_found("Feedback not found"))?;
    Ok(HttpResponse::Ok().json(DataResponse::new(latest)))
}

pub async fn update_feedback(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<FeedbackUpdate>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let conn = data.db.lock().await;
    let updated = feedback::update_feedback(&conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(updated)))
}
