use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::models::education::ReferenceInput;
use crate::services::{education, reference};
use crate::web::auth::AuthUser;
use crate::web::models::{CurriculumQuery, DataResponse, MessageResponse, SchoolSearchQuery, SchoolTypeQuery};
use crate::web::server::AppState;

pub async fn list_education_levels(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(education::list_levels(&conn)?)))
}

pub async fn list_school_types(
    data: web::Data<AppState>,
    query: web::Query<SchoolTypeQuery>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let types = education::list_school_types(&conn, query.education_level_id)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(types)))
}

pub async fn list_curriculum_types(
    data: web::Data<AppState>,
    query: web::Query<CurriculumQuery>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let curricula = education::list_curriculum_types(&conn, query.school_type_id)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(curricula)))
}

pub async fn search_schools(
    data: web::Data<AppState>,
    query: web::Query<SchoolSearchQuery>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let schools = education::search_schools(&conn, query.q.as_deref(), query.school_type_id, query.limit)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(schools)))
}

// Admin maintenance

fn deleted() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse::new("Deleted successfully"))
}

pub async fn create_education_level(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let mut conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let level = reference::create_level(&mut conn, &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(level)))
}

pub async fn update_education_level(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let mut conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let level = reference::update_level(&mut conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(level)))
}

pub async fn delete_education_level(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    reference::delete_level(&conn, id.into_inner())?;
    Ok(deleted())
}

pub async fn create_school_type(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let school_type = reference::create_school_type(&conn, &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(school_type)))
}

pub async fn update_school_type(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let school_type = reference::update_school_type(&conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(school_type)))
}

pub async fn delete_school_type(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    reference::delete_school_type(&conn, id.into_inner())?;
    Ok(deleted())
}

pub async fn create_curriculum_type(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let curriculum = reference::create_curriculum_type(&conn, &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(curriculum)))
}

pub async fn update_curriculum_type(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let curriculum = reference::update_curriculum_type(&conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(curriculum)))
}

pub async fn delete_curriculum_type(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    reference::delete_curriculum_type(&conn, id.into_inner())?;
    Ok(deleted())
}

pub async fn create_school(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let school = reference::create_school(&conn, &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(school)))
}

pub async fn update_school(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<ReferenceInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let school = reference::update_school(&conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(school)))
}

pub async fn delete_school(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    reference::delete_school(&conn, id.into_inner())?;
    Ok(deleted())
}
