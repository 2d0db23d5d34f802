//! Event image uploads: policy checks and storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::utils::{AppError, AppResult};

pub mod local;

pub use local::LocalImageStore;

pub const DEFAULT_MAX_BYTES: u64 = 1_000_000;
pub const IMAGE_TYPES: &[&str] = &["jpeg", "jpg", "png", "gif"];

/// Rules an uploaded image must satisfy and where accepted files go.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_types: Vec<String>,
    max_bytes: u64,
    destination: PathBuf,
}

impl UploadPolicy {
    pub fn new(allowed_types: &[&str], max_bytes: u64, destination: impl Into<PathBuf>) -> Self {
        Self {
            allowed_types: allowed_types.iter().map(|t| t.to_lowercase()).collect(),
            max_bytes,
            destination: destination.into(),
        }
    }

    /// Event images: jpeg, jpg, png or gif.
    pub fn images(max_bytes: u64, destination: impl Into<PathBuf>) -> Self {
        Self::new(IMAGE_TYPES, max_bytes, destination)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn check_size(&self, size: u64) -> AppResult<()> {
        if size > self.max_bytes {
            return Err(AppError::UploadTooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Validate an upload and return its lowercased extension.
    ///
    /// Both the file extension and the declared MIME subtype must be allowed.
    pub fn validate(&self, upload: &ImageUpload) -> AppResult<String> {
        self.check_size(upload.data.len() as u64)?;

        let extension = upload
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| self.allows(ext))
            .ok_or_else(|| AppError::UploadRejected(self.format_message()))?;

        let mime_ok = upload
            .content_type
            .as_deref()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .map(|ct| ct.type_() == mime::IMAGE && self.allows(ct.subtype().as_str()))
            .unwrap_or(false);
        if !mime_ok {
            return Err(AppError::UploadRejected(self.format_message()));
        }

        Ok(extension)
    }

    fn allows(&self, kind: &str) -> bool {
        let kind = kind.to_lowercase();
        self.allowed_types.iter().any(|t| *t == kind)
    }

    fn format_message(&self) -> String {
        format!("Image must be one of: {}", self.allowed_types.join(", "))
    }
}

/// A file as received from the client, not yet checked or stored.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// An upload that passed the policy and has its stored filename assigned.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub filename: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    fn policy(&self) -> &UploadPolicy;

    /// Check an upload against the policy without touching storage.
    fn accept(&self, upload: ImageUpload) -> AppResult<PendingImage> {
        match self.policy().validate(&upload) {
            Ok(extension) => Ok(PendingImage {
                filename: format!("{}.{}", uuid::Uuid::new_v4(), extension),
                data: upload.data,
            }),
            Err(err) => {
                warn!(
                    file_name = ?upload.file_name,
                    content_type = ?upload.content_type,
                    size = upload.data.len(),
                    "Image upload rejected"
                );
                Err(err)
            }
        }
    }

    /// Persist an accepted image, returning the stored filename.
    async fn store(&self, image: PendingImage) -> AppResult<String>;

    /// Remove a stored image. Missing files are not an error.
    async fn discard(&self, filename: &str) -> AppResult<()>;
}

/// Startup helper making sure the destination directory exists.
pub async fn prepare_destination(policy: &UploadPolicy) -> AppResult<()> {
    tokio::fs::create_dir_all(policy.destination()).await?;
    info!(path = ?policy.destination(), "Upload directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str, size: usize) -> ImageUpload {
        ImageUpload {
            file_name: Some(name.to_string()),
            content_type: Some(content_type.to_string()),
            data: vec![0u8; size],
        }
    }

    fn policy() -> UploadPolicy {
        UploadPolicy::images(DEFAULT_MAX_BYTES, "uploads/events")
    }

    #[test]
    fn test_accepts_allowed_image_types() {
        let policy = policy();
        assert_eq!(policy.validate(&upload("poster.PNG", "image/png", 10)).unwrap(), "png");
        assert_eq!(policy.validate(&upload("a.jpg", "image/jpeg", 10)).unwrap(), "jpg");
        assert_eq!(policy.validate(&upload("a.gif", "image/gif", 10)).unwrap(), "gif");
    }

    #[test]
    fn test_rejects_wrong_extension_or_mime() {
        let policy = policy();
        assert!(matches!(
            policy.validate(&upload("notes.txt", "image/png", 10)),
            Err(AppError::UploadRejected(_))
        ));
        assert!(matches!(
            policy.validate(&upload("poster.png", "application/pdf", 10)),
            Err(AppError::UploadRejected(_))
        ));
        assert!(matches!(
            policy.validate(&upload("poster", "image/png", 10)),
            Err(AppError::UploadRejected(_))
        ));
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let policy = policy();
        assert!(policy.validate(&upload("a.png", "image/png", 1_000_000)).is_ok());
        assert!(matches!(
            policy.validate(&upload("a.png", "image/png", 1_000_001)),
            Err(AppError::UploadTooLarge { limit: 1_000_000 })
        ));
    }

    #[test]
    fn test_missing_content_type_is_rejected() {
        let mut file = upload("a.png", "image/png", 1);
        file.content_type = None;
        assert!(policy().validate(&file).is_err());
    }
}
