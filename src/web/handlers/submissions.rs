use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::models::review::{parse_submission_status, ApprovalInput};
use crate::services::submissions;
use crate::web::auth::AuthUser;
use crate::web::models::{DataResponse, MessageResponse, StatusRequest, SubmissionListQuery, SubmitRequest};
use crate::web::server::AppState;

pub async fn submit(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<SubmitRequest>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_student()?;
    let portfolio_id = body
        .portfolio_id
        .filter(|id| *id > 0)
        .ok_or_else(|| ServiceError::validation("portfolio ID is required"))?;
    let mut conn = data.db.lock().await;
    let submission = submissions::submit(&mut conn, caller.id(), portfolio_id)?;
    Ok(HttpResponse::Created().json(DataResponse::new(submission)))
}

/// All submissions, optionally narrowed with `?status=`
pub async fn list_submissions(
    data: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<SubmissionListQuery>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_submission_status)
        .transpose()?;
    let conn = data.db.lock().await;
    let list = match status {
        Some(status) => submissions::list_by_status(&conn, status)?,
        None => submissions::list_all(&conn)?,
    };
    Ok(HttpResponse::Ok().json(DataResponse::new(list)))
}

pub async fn list_by_status(
    data: web::Data<AppState>,
    caller: AuthUser,
    status: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let status = parse_submission_status(&status)?;
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(submissions::list_by_status(&conn, status)?)))
}

pub async fn list_pending(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(submissions::list_pending(&conn)?)))
}

pub async fn list_mine(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(submissions::list_for_user(&conn, caller.id())?)))
}

/// Reviewers see every submission of a portfolio; owners only their own
pub async fn list_by_portfolio(
    data: web::Data<AppState>,
    caller: AuthUser,
    portfolio_id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let mut list = submissions::list_by_portfolio(&conn, portfolio_id.into_inner())?;
    if !caller.is_reviewer() {
        list.retain(|s| s.user_id == caller.id());
    }
    Ok(HttpResponse::Ok().json(DataResponse::new(list)))
}

pub async fn get_submission(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let submission = submissions::get_visible(&conn, id.into_inner(), &caller.user)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(submission)))
}

pub async fn update_status(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<StatusRequest>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let next = parse_submission_status(&body.status)?;
    let mut conn = data.db.lock().await;
    let submission = submissions::change_status(&mut conn, &data.hub, id.into_inner(), next)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(submission)))
}

pub async fn mark_reviewed(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let mut conn = data.db.lock().await;
    let submission = submissions::mark_reviewed(&mut conn, &data.hub, id.into_inner())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(submission)))
}

pub async fn approve(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let mut conn = data.db.lock().await;
    let submission = submissions::approve(&mut conn, &data.hub, id.into_inner())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(submission)))
}

pub async fn approve_with_scorecard(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<ApprovalInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let mut conn = data.db.lock().await;
    let submission = submissions::approve_with_scorecard(&mut conn, &data.hub, caller.id(), id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(submission)))
}

pub async fn delete_submission(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    submissions::delete_submission(&conn, &caller.user, id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Submission deleted successfully")))
}
