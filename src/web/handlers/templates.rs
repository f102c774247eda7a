use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::models::template::TemplateInput;
use crate::services::templates;
use crate::web::auth::AuthUser;
use crate::web::models::{DataResponse, MessageResponse};
use crate::web::server::AppState;

pub async fn list_templates(data: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(templates::list_templates(&conn)?)))
}

pub async fn get_template(data: web::Data<AppState>, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(templates::get_template(&conn, id.into_inner())?)))
}

pub async fn create_template(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<TemplateInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let mut conn = data.db.lock().await;
    let template = templates::create_template(&mut conn, &body)?;
    Ok(HttpResponse::Created().json(DataResponse::new(template)))
}

pub async fn delete_template(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    templates::delete_template(&conn, id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Template deleted successfully")))
}
