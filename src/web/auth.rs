use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use log::debug;
use rusqlite::Connection;

use crate::core::error::ServiceError;
use crate::models::user::{AccountType, User};
use crate::services::auth::session_user;
use crate::services::onboarding::onboarding_status;
use crate::web::server::AppState;

const FORBIDDEN: &str = "insufficient permissions";
const ONBOARDING_REQUIRED: &str = "onboarding required";

/// Caller resolved from the `Authorization: Bearer <token>` header
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    fn role(&self) -> Option<AccountType> {
        self.user.account_type()
    }

    pub fn require_student(&self) -> Result<(), ServiceError> {
        match self.role() {
            Some(AccountType::Student) => Ok(()),
            _ => Err(ServiceError::Forbidden(FORBIDDEN.to_string())),
        }
    }

    /// Teachers and admins
    pub fn require_reviewer(&self) -> Result<(), ServiceError> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(FORBIDDEN.to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        match self.role() {
            Some(AccountType::Admin) => Ok(()),
            _ => Err(ServiceError::Forbidden(FORBIDDEN.to_string())),
        }
    }

    pub fn is_reviewer(&self) -> bool {
        self.role().map_or(false, AccountType::is_reviewer)
    }

    /// Teacher, admin and user-management routes stay closed until the caller's profile is complete
    pub fn require_onboarded(&self, conn: &Connection) -> Result<(), ServiceError> {
        if onboarding_status(conn, self.id())?.completed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(ONBOARDING_REQUIRED.to_string()))
        }
    }
}

/// Token from a `Bearer` authorization header
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return None;
    }
    Some(token.trim().to_string())
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or_else(|| ServiceError::Unauthorized("authorization required".to_string()))?;
            let state = state.ok_or_else(|| ServiceError::Internal("application state missing".to_string()))?;
            let conn = state.db.lock().await;
            let user = session_user(&conn, &token)?;
            debug!("Authenticated user {}", user.id);
            Ok(AuthUser { user, token })
        })
    }
}
