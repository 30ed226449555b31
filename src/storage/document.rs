use std::collections::HashSet;
use dashmap::DashMap;
use itertools::Itertools;
use crate::entities::{Comment, CommentId, Media, MediaId, NewMedia, Project, ProjectId, ProjectSummary};
use crate::storage::{Storage, StorageError};

/// Document-shaped store: one document per project with media and comments
/// embedded as arrays.
#[derive(Debug, Default)]
pub struct DocumentStorage {
    projects: DashMap<ProjectId, Project>,
}

impl DocumentStorage {
    pub fn from_projects(projects: Vec<Project>) -> Self {
        let storage = Self::default();
        for project in projects {
            storage.projects.insert(project.id, project);
        }
        storage
    }

    pub fn snapshot(&self) -> Vec<Project> {
        self.projects.iter()
            .map(|x| x.value().clone())
            .sorted_by_key(|x| x.created_at)
            .collect()
    }

    /// Replaces the whole tree. Each project document is swapped in one
    /// insert, so readers never see an empty map in between.
    pub(crate) fn load(&self, projects: Vec<Project>) {
        let kept: HashSet<ProjectId> = projects.iter().map(|x| x.id).collect();
        self.projects.retain(|id, _| kept.contains(id));
        for project in projects {
            self.projects.insert(project.id, project);
        }
    }

    pub(crate) fn insert_project_doc(&self, project: &Project) {
        self.projects.insert(project.id, project.clone());
    }

    pub(crate) fn list_project_docs(&self) -> Vec<ProjectSummary> {
        self.projects.iter()
            .map(|x| x.value().summary())
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
            .collect()
    }

    pub(crate) fn get_project_doc(&self, id: &ProjectId) -> Option<Project> {
        let mut project = self.projects.get(id).map(|x| x.value().clone())?;
        project.sort_media();
        Some(project)
    }

    pub(crate) fn update_project_title_doc(&self, id: &ProjectId, title: &str) -> bool {
        match self.projects.get_mut(id) {
            Some(mut kvp) => {
                kvp.value_mut().title = title.to_string();
                true
            },
            None => false,
        }
    }

    pub(crate) fn delete_project_doc(&self, id: &ProjectId) -> bool {
        self.projects.remove(id).is_some()
    }

    pub(crate) fn append_media_doc(&self, project_id: &ProjectId, media: NewMedia) -> Option<Media> {
        // the shard lock is held until `kvp` drops, so position assignment cannot race
        let mut kvp = self.projects.get_mut(project_id)?;
        let project = kvp.value_mut();
        let media = media.into_media(project.next_position());
        project.media.push(media.clone());
        Some(media)
    }

    pub(crate) fn get_media_doc(&self, project_id: &ProjectId, media_id: &MediaId) -> Option<Media> {
        let kvp = self.projects.get(project_id)?;
        let mut media = kvp.value().find_media(media_id).cloned()?;
        media.comments.sort_by_key(|x| x.created_at);
        Some(media)
    }

    pub(crate) fn delete_media_doc(&self, project_id: &ProjectId, media_id: &MediaId) -> bool {
        let Some(mut kvp) = self.projects.get_mut(project_id) else { return false; };
        let project = kvp.value_mut();
        let count_before = project.media.len();
        project.media.retain(|x| &x.id != media_id);
        project.media.len() != count_before
    }

    pub(crate) fn set_media_positions_doc(&self, project_id: &ProjectId, positions: &[(MediaId, i64)]) -> bool {
        let Some(mut kvp) = self.projects.get_mut(project_id) else { return false; };
        let project = kvp.value_mut();
        for (media_id, position) in positions {
            if let Some(media) = project.find_media_mut(media_id) {
                media.position = *position;
            }
        }
        true
    }

    pub(crate) fn insert_comment_doc(&self, project_id: &ProjectId, media_id: &MediaId, comment: &Comment) -> bool {
        let Some(mut kvp) = self.projects.get_mut(project_id) else { return false; };
        match kvp.value_mut().find_media_mut(media_id) {
            Some(media) => {
                media.comments.push(comment.clone());
                true
            },
            None => false,
        }
    }

    pub(crate) fn delete_comment_doc(&self, project_id: &ProjectId, media_id: &MediaId, comment_id: &CommentId) -> bool {
        let Some(mut kvp) = self.projects.get_mut(project_id) else { return false; };
        let Some(media) = kvp.value_mut().find_media_mut(media_id) else { return false; };
        let count_before = media.comments.len();
        media.comments.retain(|x| &x.id != comment_id);
        media.comments.len() != count_before
    }
}

#[async_trait::async_trait]
impl Storage for DocumentStorage {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn insert_project(&self, project: &Project) -> Result<(), StorageError> {
        self.insert_project_doc(project);
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, StorageError> {
        Ok(self.list_project_docs())
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StorageError> {
        Ok(self.get_project_doc(id))
    }

    async fn update_project_title(&self, id: &ProjectId, title: &str) -> Result<bool, StorageError> {
        Ok(self.update_project_title_doc(id, title))
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<bool, StorageError> {
        Ok(self.delete_project_doc(id))
    }

    async fn append_media(&self, project_id: &ProjectId, media: NewMedia) -> Result<Option<Media>, StorageError> {
        Ok(self.append_media_doc(project_id, media))
    }

    async fn get_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<Option<Media>, StorageError> {
        Ok(self.get_media_doc(project_id, media_id))
    }

    async fn delete_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<bool, StorageError> {
        Ok(self.delete_media_doc(project_id, media_id))
    }

    async fn set_media_positions(&self, project_id: &ProjectId, positions: &[(MediaId, i64)]) -> Result<bool, StorageError> {
        Ok(self.set_media_positions_doc(project_id, positions))
    }

    async fn insert_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment: &Comment) -> Result<bool, StorageError> {
        Ok(self.insert_comment_doc(project_id, media_id, comment))
    }

    async fn delete_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment_id: &CommentId) -> Result<bool, StorageError> {
        Ok(self.delete_comment_doc(project_id, media_id, comment_id))
    }
}
