use actix_web::{web, HttpResponse};

use crate::core::auth::hash_password_blocking;
use crate::core::error::ServiceError;
use crate::models::education::EducationInput;
use crate::models::user::{NewUser, OnboardingInput, PersonalInfo, ProfileImageUpdate, SelfUpdate, UserUpdate};
use crate::services::{education, onboarding, users};
use crate::web::auth::AuthUser;
use crate::web::models::{DataResponse, MessageResponse, UserListQuery};
use crate::web::server::AppState;

// Admin

pub async fn list_users(
    data: web::Data<AppState>,
    caller: AuthUser,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let users = users::list_users(&conn, query.account_type)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(users)))
}

pub async fn get_user(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let user = users::get_user(&conn, id.into_inner())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(user)))
}

pub async fn create_user(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<NewUser>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    {
        let conn = data.db.lock().await;
        caller.require_onboarded(&conn)?;
    }
    body.validate()?;
    let password_hash = hash_password_blocking(body.password.clone()).await?;

    let conn = data.db.lock().await;
    let user = users::create_user(&conn, &body, &password_hash)?;
    Ok(HttpResponse::Created().json(DataResponse::new(user)))
}

pub async fn update_user(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
    body: web::Json<UserUpdate>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    {
        let conn = data.db.lock().await;
        caller.require_onboarded(&conn)?;
    }
    body.validate()?;
    let password_hash = match &body.password {
        Some(password) => Some(hash_password_blocking(password.clone()).await?),
        None => None,
    };

    let conn = data.db.lock().await;
    let user = users::update_user(&conn, id.into_inner(), &body, password_hash.as_deref())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(user)))
}

pub async fn delete_user(data: web::Data<AppState>, caller: AuthUser, id: web::Path<i64>) -> Result<HttpResponse, ServiceError> {
    caller.require_admin()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    users::delete_user(&conn, id.into_inner())?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("User deleted successfully")))
}

/// Profile of any user; mounted under both the teacher and admin scopes
pub async fn get_user_profile(
    data: web::Data<AppState>,
    caller: AuthUser,
    id: web::Path<i64>,
) -> Result<HttpResponse, ServiceError> {
    caller.require_reviewer()?;
    let conn = data.db.lock().await;
    caller.require_onboarded(&conn)?;
    let profile = onboarding::get_profile(&conn, id.into_inner())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(profile)))
}

// Self service

pub async fn my_profile(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let profile = onboarding::get_profile(&conn, caller.id())?;
    Ok(HttpResponse::Ok().json(DataResponse::new(profile)))
}

pub async fn update_me(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<SelfUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let user = users::update_me(&conn, caller.id(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(user)))
}

pub async fn update_profile_image(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<ProfileImageUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let user = users::set_profile_image(&conn, caller.id(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(user)))
}

pub async fn update_personal_info(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<PersonalInfo>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let user = users::update_personal_info(&conn, caller.id(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(user)))
}

pub async fn update_education(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<EducationInput>,
) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let info = education::upsert_education(&conn, caller.id(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(info)))
}

pub async fn onboarding_status(data: web::Data<AppState>, caller: AuthUser) -> Result<HttpResponse, ServiceError> {
    let conn = data.db.lock().await;
    let status = onboarding::onboarding_status(&conn, caller.id())?;
    Ok(HttpResponse::Ok().json(status))
}

pub async fn complete_onboarding(
    data: web::Data<AppState>,
    caller: AuthUser,
    body: web::Json<OnboardingInput>,
) -> Result<HttpResponse, ServiceError> {
    let mut conn = data.db.lock().await;
    let profile = onboarding::complete_onboarding(&mut conn, caller.id(), &body)?;
    Ok(HttpResponse::Ok().json(DataResponse::new(profile)))
}
