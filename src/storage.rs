pub mod document;
pub mod file;
pub mod sql;
#[cfg(test)]
pub(crate) mod contract;

use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use crate::config::{StorageBackend, StorageConfig};
use crate::entities::{Comment, CommentId, Media, MediaId, NewMedia, Project, ProjectId, ProjectSummary};

pub use document::DocumentStorage;
pub use file::FileStorage;
pub use sql::SqlStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read/write DB file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize/deserialize DB document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("Corrupted record: {reason}")]
    Corrupted { reason: String },
}

impl StorageError {
    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::Corrupted { reason: reason.into() }
    }
}

/// Persistence contract for the project → media → comment tree.
///
/// Methods that address a missing parent return `Ok(false)` / `Ok(None)`
/// rather than an error; `Err` is reserved for the backend itself failing.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    // lifecycle
    async fn init(&self) -> Result<(), StorageError>;
    async fn close(&self) -> Result<(), StorageError>;

    // projects
    async fn insert_project(&self, project: &Project) -> Result<(), StorageError>;
    /// Newest first.
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, StorageError>;
    /// Media sorted ascending by position, comments by creation time.
    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StorageError>;
    async fn update_project_title(&self, id: &ProjectId, title: &str) -> Result<bool, StorageError>;
    async fn delete_project(&self, id: &ProjectId) -> Result<bool, StorageError>;

    // media
    /// Places the media one past the current maximum position (0 when empty).
    async fn append_media(&self, project_id: &ProjectId, media: NewMedia) -> Result<Option<Media>, StorageError>;
    async fn get_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<Option<Media>, StorageError>;
    async fn delete_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<bool, StorageError>;
    async fn set_media_positions(&self, project_id: &ProjectId, positions: &[(MediaId, i64)]) -> Result<bool, StorageError>;

    // comments
    async fn insert_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment: &Comment) -> Result<bool, StorageError>;
    async fn delete_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment_id: &CommentId) -> Result<bool, StorageError>;
}

/// Builds and initializes the configured backend.
pub async fn open_storage(cfg: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    let storage: Arc<dyn Storage> = match cfg.backend {
        StorageBackend::Document => {
            info!("storage: in-memory documents");
            Arc::new(DocumentStorage::default())
        },
        StorageBackend::File => {
            info!("storage: json file at {}", cfg.db_path.display());
            Arc::new(FileStorage::new(cfg.db_path.clone()))
        },
        StorageBackend::Sql => {
            info!("storage: sql at {}", &cfg.database_url);
            Arc::new(SqlStorage::connect(&cfg.database_url).await?)
        },
    };
    storage.init().await?;
    Ok(storage)
}
