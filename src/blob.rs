pub mod local;
pub mod s3;

use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use crate::config::{BlobBackend, BlobConfig};
use crate::entities::{MediaType, UploadFile};

pub use local::LocalBlobStore;
pub use self::s3::S3BlobStore;

pub type BlobResult<T> = Result<T, BlobError>;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Blob not found: {id}")]
    NotFound { id: String },

    #[error("Invalid blob key: {key}")]
    InvalidKey { key: String },

    #[error("Blob store misconfigured: {reason}")]
    Misconfigured { reason: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend { source: Box::new(error) }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    pub fn misconfigured(reason: impl Into<String>) -> Self {
        Self::Misconfigured { reason: reason.into() }
    }

    pub fn upload_failed(reason: impl Into<String>) -> Self {
        Self::UploadFailed { reason: reason.into() }
    }
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub url: String,
    /// `<folder>/<name>` without extension; what `delete` expects.
    pub public_id: String,
}

/// External object storage for media bytes.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, folder: &str, kind: MediaType, file: &UploadFile) -> BlobResult<StoredBlob>;

    async fn delete(&self, public_id: &str, kind: MediaType) -> BlobResult<()>;

    /// Removes the folder and everything under it. A missing folder is not an error.
    async fn delete_folder(&self, folder: &str) -> BlobResult<()>;
}

/// Recovers a public id from an object URL: the last two path segments with
/// the extension stripped, under `root_folder`.
///
/// Only valid for URLs of the form `<prefix>/<root>/<project>/<name>.<ext>`.
/// Media written by this crate carry their public id, this is for records
/// that predate it.
pub fn public_id_from_url(url: &str, root_folder: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?.trim_end_matches('/');
    let mut segments = path.rsplit('/');
    let name = segments.next().filter(|x| !x.is_empty())?;
    let parent = segments.next().filter(|x| !x.is_empty())?;
    let stem = name.split('.').next().filter(|x| !x.is_empty())?;
    Some(format!("{}/{}/{}", root_folder.trim_matches('/'), parent, stem))
}

pub async fn open_blob_store(cfg: &BlobConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match cfg.backend {
        BlobBackend::Local => {
            info!("blob store: local dir {}", cfg.blob_dir.display());
            tokio::fs::create_dir_all(&cfg.blob_dir).await?;
            Arc::new(LocalBlobStore::new(cfg.blob_dir.clone(), cfg.public_url.clone()))
        },
        BlobBackend::S3 => {
            let s3_cfg = cfg.s3.as_ref()
                .ok_or_else(|| anyhow::anyhow!("S3 blob backend selected but S3 settings are missing"))?;
            info!("blob store: s3 bucket {}", &s3_cfg.bucket_name);
            Arc::new(S3BlobStore::new(s3_cfg, cfg.public_url.clone())?)
        },
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_from_cloud_style_url() {
        let url = "https://res.example.com/demo/image/upload/v1712/proofed/6f1c/abc123.jpg";
        assert_eq!(public_id_from_url(url, "proofed").as_deref(), Some("proofed/6f1c/abc123"));
    }

    #[test]
    fn public_id_from_local_url() {
        let url = "http://localhost:3000/blobs/proofed/6f1c/abc123.mp4?v=2";
        assert_eq!(public_id_from_url(url, "proofed/").as_deref(), Some("proofed/6f1c/abc123"));
    }

    #[test]
    fn public_id_needs_two_segments() {
        assert_eq!(public_id_from_url("abc123.jpg", "proofed"), None);
        assert_eq!(public_id_from_url("", "proofed"), None);
        assert_eq!(public_id_from_url("/.jpg", "proofed"), None);
    }
}
