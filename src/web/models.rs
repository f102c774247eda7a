use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Standard success envelope
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Serialize)]
pub struct DataMessageResponse<T> {
    pub data: T,
    pub message: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// One page of a listing
#[derive(Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub message: String,
    pub count: usize,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// System status response
#[derive(Serialize)]
pub struct SystemStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub connected_clients: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct FileUploadResponse {
    pub file_path: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UserListQuery {
    pub account_type: Option<i64>,
}

#[derive(Deserialize)]
pub struct SchoolTypeQuery {
    pub education_level_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CurriculumQuery {
    pub school_type_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct SchoolSearchQuery {
    pub q: Option<String>,
    pub school_type_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct FontListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize)]
pub struct PortfolioListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub include_blocks: Option<bool>,
}

#[derive(Deserialize)]
pub struct IncludeBlocksQuery {
    pub include_blocks: Option<bool>,
}

#[derive(Deserialize, Default)]
pub struct UseTemplateRequest {
    pub portfolio_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub portfolio_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize)]
pub struct SubmissionListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: String,
}
