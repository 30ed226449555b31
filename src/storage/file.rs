use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};
use crate::entities::{Comment, CommentId, Media, MediaId, NewMedia, Project, ProjectId, ProjectSummary};
use crate::storage::{DocumentStorage, Storage, StorageError};

/// Flat-file store: the whole project tree lives in a single JSON document.
///
/// Reads are served from the in-memory documents loaded by `init`; every
/// write that changes something rewrites the file (temp file + rename).
pub struct FileStorage {
    db_path: PathBuf,
    docs: DocumentStorage,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            docs: DocumentStorage::default(),
            write_lock: Mutex::new(()),
        }
    }

    async fn write_file(&self, projects: &[Project]) -> Result<(), StorageError> {
        let serialized = serde_json::to_vec_pretty(projects)?;
        let tmp_path = self.db_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &serialized).await?;
        tokio::fs::rename(&tmp_path, &self.db_path).await?;
        debug!("db file written: {} projects", projects.len());
        Ok(())
    }

    /// Applies `change` to a staged copy of the documents. The copy replaces
    /// the live documents only once it is on disk; a failed write leaves
    /// readers on the previous state.
    async fn commit<T, F>(&self, change: F) -> Result<T, StorageError>
    where
        F: FnOnce(&DocumentStorage) -> (T, bool),
    {
        let _guard = self.write_lock.lock().await;
        let staged = DocumentStorage::from_projects(self.docs.snapshot());
        let (result, changed) = change(&staged);
        if changed {
            let projects = staged.snapshot();
            self.write_file(&projects).await?;
            self.docs.load(projects);
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl Storage for FileStorage {
    async fn init(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        if !tokio::fs::try_exists(&self.db_path).await? {
            if let Some(parent) = self.db_path.parent().filter(|x| !x.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&self.db_path, "[]").await?;
        }
        let file_str = tokio::fs::read_to_string(&self.db_path).await?;
        let projects: Vec<Project> = if file_str.trim().is_empty() {
            vec![]
        } else {
            serde_json::from_str(&file_str)?
        };
        info!("db file loaded: {} projects", projects.len());
        self.docs.load(projects);
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.write_file(&self.docs.snapshot()).await
    }

    async fn insert_project(&self, project: &Project) -> Result<(), StorageError> {
        self.commit(|docs| (docs.insert_project_doc(project), true)).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, StorageError> {
        Ok(self.docs.list_project_docs())
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StorageError> {
        Ok(self.docs.get_project_doc(id))
    }

    async fn update_project_title(&self, id: &ProjectId, title: &str) -> Result<bool, StorageError> {
        self.commit(|docs| {
            let changed = docs.update_project_title_doc(id, title);
            (changed, changed)
        }).await
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<bool, StorageError> {
        self.commit(|docs| {
            let changed = docs.delete_project_doc(id);
            (changed, changed)
        }).await
    }

    async fn append_media(&self, project_id: &ProjectId, media: NewMedia) -> Result<Option<Media>, StorageError> {
        self.commit(|docs| {
            let maybe_media = docs.append_media_doc(project_id, media);
            let changed = maybe_media.is_some();
            (maybe_media, changed)
        }).await
    }

    async fn get_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<Option<Media>, StorageError> {
        Ok(self.docs.get_media_doc(project_id, media_id))
    }

    async fn delete_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<bool, StorageError> {
        self.commit(|docs| {
            let changed = docs.delete_media_doc(project_id, media_id);
            (changed, changed)
        }).await
    }

    async fn set_media_positions(&self, project_id: &ProjectId, positions: &[(MediaId, i64)]) -> Result<bool, StorageError> {
        self.commit(|docs| {
            let changed = docs.set_media_positions_doc(project_id, positions);
            (changed, changed)
        }).await
    }

    async fn insert_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment: &Comment) -> Result<bool, StorageError> {
        self.commit(|docs| {
            let changed = docs.insert_comment_doc(project_id, media_id, comment);
            (changed, changed)
        }).await
    }

    async fn delete_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment_id: &CommentId) -> Result<bool, StorageError> {
        self.commit(|docs| {
            let changed = docs.delete_comment_doc(project_id, media_id, comment_id);
            (changed, changed)
        }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{MediaType, NewComment};
    use crate::storage::contract;

    #[tokio::test]
    async fn file_storage_contract() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("proofed.db.json"));
        storage.init().await.unwrap();
        contract::run_all(&storage).await;
    }

    #[tokio::test]
    async fn tree_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("proofed.db.json");

        let storage = FileStorage::new(db_path.clone());
        storage.init().await.unwrap();
        let project = Project::new("Launch Campaign".to_string());
        storage.insert_project(&project).await.unwrap();
        let new_media = NewMedia { url: "http://localhost/a.png".to_string(), blob_id: Some("proofed/a".to_string()), kind: MediaType::Image };
        let media = storage.append_media(&project.id, new_media).await.unwrap().unwrap();
        let comment = NewComment { x: 50.0, y: 50.0, text: "fix logo".to_string(), author: None }.into_comment();
        storage.insert_comment(&project.id, &media.id, &comment).await.unwrap();
        let before = storage.get_project(&project.id).await.unwrap();

        let reopened = FileStorage::new(db_path);
        reopened.init().await.unwrap();
        let after = reopened.get_project(&project.id).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(after.unwrap().media[0].comments[0].text, "fix logo");
    }

    #[tokio::test]
    async fn empty_file_is_an_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("proofed.db.json");
        tokio::fs::write(&db_path, "").await.unwrap();
        let storage = FileStorage::new(db_path);
        storage.init().await.unwrap();
        assert!(storage.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("proofed.db.json");
        let storage = FileStorage::new(db_path.clone());
        storage.init().await.unwrap();
        let kept = Project::new("Kept".to_string());
        storage.insert_project(&kept).await.unwrap();

        // a directory in place of the temp file makes every write fail
        let tmp_path = db_path.with_extension("json.tmp");
        std::fs::create_dir(&tmp_path).unwrap();

        let rejected = Project::new("Rejected".to_string());
        assert!(matches!(storage.insert_project(&rejected).await, Err(StorageError::Io(_))));
        assert_eq!(storage.get_project(&rejected.id).await.unwrap(), None);
        assert!(storage.delete_project(&kept.id).await.is_err());
        assert!(storage.get_project(&kept.id).await.unwrap().is_some());
        assert!(storage.update_project_title(&kept.id, "Renamed").await.is_err());
        assert_eq!(storage.get_project(&kept.id).await.unwrap().unwrap().title, "Kept");

        // once writes work again, only the committed state reaches disk
        std::fs::remove_dir(&tmp_path).unwrap();
        storage.update_project_title(&kept.id, "Renamed").await.unwrap();
        let reopened = FileStorage::new(db_path);
        reopened.init().await.unwrap();
        let listed = reopened.list_projects().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Renamed");
    }

    #[tokio::test]
    async fn malformed_file_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("proofed.db.json");
        tokio::fs::write(&db_path, "{not json").await.unwrap();
        let storage = FileStorage::new(db_path);
        assert!(matches!(storage.init().await, Err(StorageError::Serialization(_))));
    }
}
