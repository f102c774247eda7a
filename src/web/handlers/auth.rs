use actix_web::{web, HttpResponse};

use crate::core::error::ServiceError;
use crate::services::auth;
use crate::web::auth::AuthUser;
use crate::web::models::{
    DataResponse, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, ResetPasswordRequest,
};
use crate::web::server::AppState;

pub async fn login(data: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, ServiceError> {
    let (token, user) = auth::login(&data.db, &body.email, &body.password, data.session_ttl_hours).await?;
    Ok(HttpResponse::Ok().json(LoginResponse { token, user }))
}

pub async fn logout(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    auth::delete_session(&conn, &caller.token)?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("logged out")))
}

pub async fn me(caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(DataResponse::new(caller.user)))
}

pub async fn forgot_password(
    data: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ServiceError> {
    let message = data.password_resets.request_reset(&body.email).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(message)))
}

pub async fn reset_password(
    data: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ServiceError> {
    let message = data.password_resets.reset_password(&body.token, &body.new_password).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(message)))
}
