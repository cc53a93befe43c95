/// Disk-backed media storage
use crate::{
    config::MediaConfig,
    error::{ApiError, ApiResult},
    media::{ObjectStore, UploadedObject},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Stores media files under the public media directory
///
/// Files are renamed to a UUID (original extension kept) so staged upload
/// names never collide or leak.
#[derive(Clone)]
pub struct DiskObjectStore {
    media_directory: PathBuf,
    public_base_url: String,
}

impl DiskObjectStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            media_directory: config.media_directory.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_name(local_path: &Path) -> String {
        let id = Uuid::new_v4().to_string();
        match local_path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", id, ext),
            None => id,
        }
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn upload(&self, local_path: &Path) -> ApiResult<UploadedObject> {
        if !fs::try_exists(local_path).await.unwrap_or(false) {
            return Err(ApiError::MediaStorage(format!(
                "Staged file {} does not exist",
                local_path.display()
            )));
        }

        fs::create_dir_all(&self.media_directory).await.map_err(|e| {
            ApiError::MediaStorage(format!("Failed to create media directory: {}", e))
        })?;

        let name = Self::object_name(local_path);
        let target = self.media_directory.join(&name);

        fs::copy(local_path, &target).await.map_err(|e| {
            ApiError::MediaStorage(format!(
                "Failed to store {}: {}",
                local_path.display(),
                e
            ))
        })?;

        // Staged files are temporary; removal failure is not fatal
        if let Err(e) = fs::remove_file(local_path).await {
            tracing::warn!("Failed to remove staged file {}: {}", local_path.display(), e);
        }

        Ok(UploadedObject {
            url: format!("{}/{}", self.public_base_url, name),
        })
    }
}
