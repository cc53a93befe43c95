/// Media storage seam
///
/// Registration stages avatar/cover files on local disk; an ObjectStore
/// backend turns a staged file into a permanently hosted URL. The hosting
/// service itself is external; only this seam is part of the service.

mod disk;

pub use disk::DiskObjectStore;

use crate::error::ApiResult;
use async_trait::async_trait;
use std::path::Path;

/// A successfully uploaded media object
#[derive(Debug, Clone)]
pub struct UploadedObject {
    /// Permanent public URL
    pub url: String,
}

/// Media storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a staged local file, returning its permanent URL
    async fn upload(&self, local_path: &Path) -> ApiResult<UploadedObject>;
}
