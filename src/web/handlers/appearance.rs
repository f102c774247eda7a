use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::models::appearance::{ColorsInput, FontInput};
use crate::services::appearance;
use crate::web::auth::AuthUser;
use crate::web::models::{DataResponse, FontListQuery, MessageResponse};
use crate::web::server::AppState;

pub async fn list_colors(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(appearance::list_colors(&conn)?)))
}

pub async fn get_colors(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(appearance::get_colors(&conn, id.into_inner())?)))
}

pub async fn create_colors(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ColorsInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    let colors = appearance::create_colors(&conn, &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(colors)))
}

pub async fn update_colors(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<ColorsInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    let colors = appearance::update_colors(&conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(colors)))
}

pub async fn delete_colors(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    appearance::delete_colors(&conn, id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Colors deleted successfully")))
}

/// Active fonts for everyone
pub async fn list_fonts(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(appearance::list_fonts(&conn, false)?)))
}

pub async fn admin_list_fonts(
    data: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<FontListQuery>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    let fonts = appearance::list_fonts(&conn, query.include_inactive)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(fonts)))
}

pub async fn create_font(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<FontInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    let font = appearance::create_font(&conn, &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(font)))
}

pub async fn update_font(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<FontInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    let font = appearance::update_font(&conn, id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(font)))
}

pub async fn delete_font(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    appearance::delete_font(&conn, id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Font deleted successfully")))
}
