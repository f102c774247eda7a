use chrono::Utc;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::core::error::ServiceError;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 11] = [
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "pdf", "doc", "docx", "xls", "xlsx",
];
pub const PUBLIC_PREFIX: &str = "/uploads";

const TOO_LARGE: &str = "File size must not exceed 5MB";
const NOT_ALLOWED: &str = "File type not allowed. Allowed types: images (jpg, jpeg, png, gif, webp, bmp) and documents (pdf, doc, docx, xls, xlsx)";

/// Result of a delete request; missing files are not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

impl DeleteOutcome {
    pub fn message(self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => "File deleted successfully",
            DeleteOutcome::NotFound => "File deleted or not found",
        }
    }
}

/// Uploaded files on local disk, served back under `/uploads`
pub struct UploadStore {
    dir: PathBuf,
    base_url: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if needed
    pub async fn ensure_dir(&self) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Lowercased extension with its dot, if allowed
    pub fn allowed_extension(filename: &str) -> Result<String, ServiceError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            Ok(format!(".{}", ext))
        } else {
            Err(ServiceError::validation(NOT_ALLOWED))
        }
    }

    pub fn check_size(size: usize) -> Result<(), ServiceError> {
        if size > MAX_UPLOAD_BYTES {
            return Err(ServiceError::validation(TOO_LARGE));
        }
        Ok(())
    }

    /// Path clients use to fetch a stored file
    pub fn public_path(&self, name: &str) -> String {
        format!("{}{}/{}", self.base_url, PUBLIC_PREFIX, name)
    }

    /// Store the bytes under a fresh `<unix nanos><ext>` name and return its public path
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        let ext = Self::allowed_extension(original_name)?;
        Self::check_size(bytes.len())?;

        self.ensure_dir().await?;
        let mut stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut name = format!("{}{}", stamp, ext);
        while tokio::fs::try_exists(self.dir.join(&name)).await? {
            stamp += 1;
            name = format!("{}{}", stamp, ext);
        }
        tokio::fs::write(self.dir.join(&name), bytes).await?;

        info!("Stored upload {} ({} bytes)", name, bytes.len());
        Ok(self.public_path(&name))
    }

    pub async fn delete(&self, filename: &str) -> Result<DeleteOutcome, ServiceError> {
        if filename.is_empty() || filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return Err(ServiceError::validation("Invalid filename"));
        }
        match tokio::fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => {
                info!("Deleted upload {}", filename);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => {
                warn!("Could not delete upload {}: {}", filename, e);
                Ok(DeleteOutcome::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extension_allow_list() {
        assert_eq!(UploadStore::allowed_extension("Photo.JPG").unwrap(), ".jpg");
        assert_eq!(UploadStore::allowed_extension("report.docx").unwrap(), ".docx");
        for name in ["script.exe", "noext", "vector.svg"] {
            match UploadStore::allowed_extension(name) {
                Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, NOT_ALLOWED),
                other => panic!("unexpected result for {}: {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_size_limit() {
        assert!(UploadStore::check_size(MAX_UPLOAD_BYTES).is_ok());
        match UploadStore::check_size(MAX_UPLOAD_BYTES + 1) {
            Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, "File size must not exceed 5MB"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let tmp = TempDir::new().unwrap();
        let store = UploadStore::new(tmp.path().join("uploads"), "");

        let path = store.save("avatar.png", b"png-bytes").await.unwrap();
        assert!(path.starts_with("/uploads/"));
        assert!(path.ends_with(".png"));

        let name = path.trim_start_matches("/uploads/");
        assert_eq!(std::fs::read(store.dir().join(name)).unwrap(), b"png-bytes");

        assert_eq!(store.delete(name).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(store.delete(name).await.unwrap(), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let tmp = TempDir::new().unwrap();
        let store = UploadStore::new(tmp.path(), "");
        let first = store.save("a.pdf", b"1").await.unwrap();
        let second = store.save("a.pdf", b"2").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_base_url_prefix() {
        let tmp = TempDir::new().unwrap();
        let store = UploadStore::new(tmp.path(), "https://sutportfolio.online/");
        let path = store.save("a.gif", b"gif").await.unwrap();
        assert!(path.starts_with("https://sutportfolio.online/uploads/"));
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let tmp = TempDir::new().unwrap();
        let store = UploadStore::new(tmp.path(), "");
        for name in ["../secret", "a/b.png", "a\\b.png", ".."] {
            match store.delete(name).await {
                Err(ServiceError::ValidationError(msg)) => assert_eq!(msg, "Invalid filename"),
                other => panic!("unexpected result for {}: {:?}", name, other),
            }
        }
    }
}
