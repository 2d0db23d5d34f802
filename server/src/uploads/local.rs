//! Local filesystem image storage.

use std::io::ErrorKind;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::{ImageStore, PendingImage, UploadPolicy};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct LocalImageStore {
    policy: UploadPolicy,
}

impl LocalImageStore {
    pub fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    /// Stored names are generated by `accept`; anything with a path
    /// component did not come from there.
    fn checked_name(filename: &str) -> AppResult<&str> {
        if filename.is_empty() || filename.contains(&['/', '\\'][..]) || filename.starts_with('.') {
            return Err(AppError::UploadRejected(format!(
                "Invalid stored filename '{}'",
                filename
            )));
        }
        Ok(filename)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    async fn store(&self, image: PendingImage) -> AppResult<String> {
        let name = Self::checked_name(&image.filename)?;
        let path = self.policy.destination().join(name);
        fs::write(&path, &image.data).await?;
        debug!(path = ?path, size = image.data.len(), "Stored event image");
        Ok(image.filename)
    }

    async fn discard(&self, filename: &str) -> AppResult<()> {
        let path = self.policy.destination().join(Self::checked_name(filename)?);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, "Discarded event image");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = ?path, "Image to discard was already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
