use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::models::announcement::{NotificationInput, NotificationUpdate};
use crate::services::notifications;
use crate::web::auth::AuthUser;
use crate::web::models::{CountResponse, DataResponse, MessageResponse, UnreadCountResponse};
use crate::web::server::AppState;

pub async fn notify_students(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<NotificationInput>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let mut conn = data.db.lock().await;
    let count = notifications::notify_students(&mut conn, &data.hub, &body)?;
    Ok(HttpResponse::Ok().json(CountResponse {
        message: "Notifications sent to students successfully".to_string(),
        count,
    }))
}

pub async fn list_mine(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    Ok(HttpResponse::Ok().json(DataResponse::new(notifications::list_for_user(&conn, caller.id())?)))
}

pub async fn unread_count(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let count = notifications::unread_count(&conn, caller.id())?;
    Ok(HttpResponse::Ok().json(UnreadCountResponse { count }))
}

pub async fn get_notification(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let notification = notifications::get_own(&conn, caller.id(), id.into_inner())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(notification)))
}

pub async fn update_notification(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<NotificationUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let notification = notifications::update_own(&conn, caller.id(), id.into_inner(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(notification)))
}

pub async fn delete_notification(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    notifications::delete_own(&conn, caller.id(), id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Notification deleted successfully")))
}

pub async fn mark_read(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let notification = notifications::mark_read(&conn, caller.id(), id.into_inner())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(notification)))
}

pub async fn mark_all_read(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let count = notifications::mark_all_read(&conn, caller.id())?;
    Ok(HttpResponse::Ok().json(CountResponse {
        message: "All notifications marked as read".to_string(),
        count,
    }))
}
