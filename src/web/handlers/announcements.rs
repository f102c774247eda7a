use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::models::announcement::AnnouncementInput;
use crate::services::announcements;
use crate::web::auth::AuthUser;
use crate::web::models::{DataResponse, MessageResponse};
use crate::web::server::AppState;

pub async fn list_public(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(announcements::list_public(&conn)?)))
}

pub async fn get_public(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(announcements::get_public(&conn, id.into_inner())?)))
}

pub async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(announcements::list_categories(&conn)?)))
}

pub async fn admin_list(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(announcements::list_all(&conn)?)))
}

pub async fn admin_get(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(announcements::get_announcement(&conn, id.into_inner())?)))
}

pub async fn create(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<AnnouncementInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let mut conn = data.db.lock().await;
    let announcement = announcements::create_announcement(&mut conn, &data.hub, caller.id(), &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(announcement)))
}

pub async fn update(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<AnnouncementInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let mut conn = data.db.lock().await;
    let announcement = announcements::update_announcement(&mut conn, &data.hub, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(announcement)))
}

pub async fn delete(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    announcements::delete_announcement(&conn, id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Announcement deleted successfully")))
}
