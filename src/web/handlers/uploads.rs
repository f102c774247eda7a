use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;

use crate::core::error::ServiceError;
use crate::services::uploads::UploadStore;
use crate::web::auth::AuthUser;
use crate::web::models::{FileUploadResponse, MessageResponse};
use crate::web::server::AppState;

const FILE_FIELD: &str = "file";

/// Store the multipart `file` field. Size is enforced while streaming.
pub async fn upload_file(
    data: web::Data<AppState>,
    _caller: AuthUser,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ServiceError::validation(format!("invalid upload: {}", e)))?;
        if field.name() != FILE_FIELD {
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();
        UploadStore::allowed_extension(&filename)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ServiceError::validation(format!("invalid upload: {}", e)))?;
            UploadStore::check_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        let file_path = data.uploads.save(&filename, &bytes).await?;
        return Ok(HttpResponse::Ok().json(FileUploadResponse { file_path }));
    }

    Err(ServiceError::validation("No file uploaded"))
}

pub async fn delete_file(
    data: web::Data<AppState>,
    _caller: AuthUser,
    filename: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let outcome = data.uploads.delete(&filename).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new(outcome.message())))
}
