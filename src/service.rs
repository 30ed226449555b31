use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::blob::{open_blob_store, public_id_from_url, BlobStore};
use crate::config::Config;
use crate::entities::{Comment, CommentId, Media, MediaId, NewComment, NewMedia, Project, ProjectId, ProjectSummary, UploadFile};
use crate::error::{ProofedError, ProofedResult};
use crate::storage::{open_storage, Storage};

const COORDINATE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Project/media/comment operations over a persistence backend and a blob store.
///
/// Holds no project state of its own: every read goes to storage, so writes
/// made by other processes sharing the backend are visible immediately.
pub struct ProjectService {
    storage: Arc<dyn Storage>,
    blobs: Arc<dyn BlobStore>,
    root_folder: String,
    max_files_per_upload: usize,
}

impl ProjectService {
    pub fn new(storage: Arc<dyn Storage>, blobs: Arc<dyn BlobStore>, root_folder: String, max_files_per_upload: usize) -> Self {
        Self {
            storage,
            blobs,
            root_folder: root_folder.trim_matches('/').to_string(),
            max_files_per_upload,
        }
    }

    /// Opens the configured storage and blob store.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let storage = open_storage(&config.storage).await?;
        let blobs = open_blob_store(&config.blob).await?;
        Ok(Self::new(storage, blobs, config.blob.root_folder.clone(), config.api.max_files_per_upload))
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn max_files_per_upload(&self) -> usize {
        self.max_files_per_upload
    }

    /// Blob folder holding every object of a project.
    pub fn project_folder(&self, project_id: &ProjectId) -> String {
        format!("{}/{}", &self.root_folder, project_id)
    }

    pub async fn create_project(&self, title: &str) -> ProofedResult<Project> {
        let title = checked_title(title)?;
        let project = Project::new(title);
        self.storage.insert_project(&project).await?;
        info!("project created: {} ({})", &project.title, project.id);
        Ok(project)
    }

    /// Newest first.
    pub async fn list_projects(&self) -> ProofedResult<Vec<ProjectSummary>> {
        Ok(self.storage.list_projects().await?)
    }

    pub async fn get_project(&self, project_id: &ProjectId) -> ProofedResult<Option<Project>> {
        Ok(self.storage.get_project(project_id).await?)
    }

    pub async fn update_project_title(&self, project_id: &ProjectId, title: &str) -> ProofedResult<()> {
        let title = checked_title(title)?;
        let updated = self.storage.update_project_title(project_id, &title).await?;
        if !updated {
            return Err(ProofedError::not_found("project", project_id));
        }
        Ok(())
    }

    /// Uploads the files one at a time, appending a media item after each
    /// successful upload. A failed upload stops the queue; media appended
    /// before it stay committed.
    pub async fn upload_media(&self, project_id: &ProjectId, files: Vec<UploadFile>) -> ProofedResult<Vec<Media>> {
        if files.len() > self.max_files_per_upload {
            return Err(ProofedError::validation(
                "files",
                format!("at most {} files per upload, got {}", self.max_files_per_upload, files.len()),
            ));
        }
        if self.storage.get_project(project_id).await?.is_none() {
            return Err(ProofedError::not_found("project", project_id));
        }

        let folder = self.project_folder(project_id);
        let mut created = Vec::with_capacity(files.len());
        for file in files {
            let kind = file.kind();
            let stored = self.blobs.upload(&folder, kind, &file)
                .await
                .map_err(ProofedError::Upload)?;
            debug!("uploaded {} as {}", &file.file_name, &stored.public_id);

            let new_media = NewMedia {
                url: stored.url,
                blob_id: Some(stored.public_id),
                kind,
            };
            let media = self.storage.append_media(project_id, new_media).await?;
            let media = media.ok_or_else(|| ProofedError::not_found("project", project_id))?;
            created.push(media);
        }
        info!("project {}: {} media uploaded", project_id, created.len());
        Ok(created)
    }

    /// Sets each media's position to its index in `media_ids`, which must list
    /// every media of the project exactly once.
    pub async fn reorder_media(&self, project_id: &ProjectId, media_ids: &[MediaId]) -> ProofedResult<()> {
        let Some(project) = self.storage.get_project(project_id).await? else {
            warn!("reorder skipped, project not found: {}", project_id);
            return Ok(());
        };

        let requested = media_ids.iter().collect::<HashSet<&MediaId>>();
        let existing = project.media.iter().map(|x| &x.id).collect::<HashSet<&MediaId>>();
        if requested.len() != media_ids.len() {
            return Err(ProofedError::validation("media_ids", "contains duplicates"));
        }
        if requested != existing {
            return Err(ProofedError::validation(
                "media_ids",
                format!("expected all {} media of the project, got {}", existing.len(), media_ids.len()),
            ));
        }

        let positions = media_ids.iter()
            .enumerate()
            .map(|(index, id)| (*id, index as i64))
            .collect::<Vec<(MediaId, i64)>>();
        self.storage.set_media_positions(project_id, &positions).await?;
        Ok(())
    }

    pub async fn add_comment(&self, project_id: &ProjectId, media_id: &MediaId, new_comment: NewComment) -> ProofedResult<Comment> {
        check_coordinate("x", new_comment.x)?;
        check_coordinate("y", new_comment.y)?;
        if new_comment.text.trim().is_empty() {
            return Err(ProofedError::validation("text", "must not be empty"));
        }

        let comment = new_comment.into_comment();
        let inserted = self.storage.insert_comment(project_id, media_id, &comment).await?;
        if !inserted {
            return Err(self.missing_media(project_id, media_id).await?);
        }
        Ok(comment)
    }

    /// Removes the comment. Absent comments are not an error.
    pub async fn delete_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment_id: &CommentId) -> ProofedResult<()> {
        let removed = self.storage.delete_comment(project_id, media_id, comment_id).await?;
        if !removed {
            debug!("comment already gone: {}", comment_id);
        }
        Ok(())
    }

    /// Drops the media's blob (best effort), then the media and its comments.
    pub async fn delete_media(&self, project_id: &ProjectId, media_id: &MediaId) -> ProofedResult<()> {
        if let Some(media) = self.storage.get_media(project_id, media_id).await? {
            self.delete_media_blob(&media).await;
        }
        let removed = self.storage.delete_media(project_id, media_id).await?;
        if !removed {
            return Err(self.missing_media(project_id, media_id).await?);
        }
        info!("media deleted: {}", media_id);
        Ok(())
    }

    /// Drops every media blob and the project folder (best effort), then the
    /// project with everything under it.
    pub async fn delete_project(&self, project_id: &ProjectId) -> ProofedResult<()> {
        if let Some(project) = self.storage.get_project(project_id).await? {
            for media in project.media.iter() {
                self.delete_media_blob(media).await;
            }
            let folder = self.project_folder(project_id);
            if let Err(e) = self.blobs.delete_folder(&folder).await {
                warn!("failed to delete blob folder {}: {}", &folder, e);
            }
        }
        let removed = self.storage.delete_project(project_id).await?;
        if !removed {
            return Err(ProofedError::not_found("project", project_id));
        }
        info!("project deleted: {}", project_id);
        Ok(())
    }

    /// Every project with its full tree, newest first.
    pub async fn export(&self) -> ProofedResult<Vec<Project>> {
        let summaries = self.storage.list_projects().await?;
        let mut projects = Vec::with_capacity(summaries.len());
        for summary in summaries {
            // deleted between the two reads
            if let Some(project) = self.storage.get_project(&summary.id).await? {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    async fn delete_media_blob(&self, media: &Media) {
        let public_id = media.blob_id.clone()
            .or_else(|| public_id_from_url(&media.url, &self.root_folder));
        let Some(public_id) = public_id else {
            warn!("no blob id for media {} ({})", media.id, &media.url);
            return;
        };
        if let Err(e) = self.blobs.delete(&public_id, media.kind).await {
            warn!("failed to delete blob {}: {}", &public_id, e);
        }
    }

    async fn missing_media(&self, project_id: &ProjectId, media_id: &MediaId) -> ProofedResult<ProofedError> {
        let error = match self.storage.get_project(project_id).await? {
            None => ProofedError::not_found("project", project_id),
            Some(_) => ProofedError::not_found("media", media_id),
        };
        Ok(error)
    }
}

fn checked_title(title: &str) -> ProofedResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ProofedError::validation("title", "must not be empty"));
    }
    Ok(title.to_string())
}

fn check_coordinate(field: &'static str, value: f64) -> ProofedResult<()> {
    if !value.is_finite() || !COORDINATE_RANGE.contains(&value) {
        return Err(ProofedError::validation(field, format!("must be within 0..=100, got {}", value)));
    }
    Ok(())
}
