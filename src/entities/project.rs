use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::entities::Media;

pub type ProjectId = Uuid;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub media: Vec<Media>,
}

impl Project {
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            created_at: Utc::now(),
            media: vec![],
        }
    }

    /// Next free position: one past the current maximum, or 0 for an empty project.
    pub fn next_position(&self) -> i64 {
        self.media.iter().map(|x| x.position).max().map(|x| x + 1).unwrap_or(0)
    }

    pub fn find_media(&self, media_id: &Uuid) -> Option<&Media> {
        self.media.iter().find(|x| &x.id == media_id)
    }

    pub fn find_media_mut(&mut self, media_id: &Uuid) -> Option<&mut Media> {
        self.media.iter_mut().find(|x| &x.id == media_id)
    }

    pub fn sort_media(&mut self) {
        self.media.sort_by_key(|x| x.position);
        for media in self.media.iter_mut() {
            media.comments.sort_by_key(|x| x.created_at);
        }
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            title: self.title.clone(),
            created_at: self.created_at,
            media_count: self.media.len(),
        }
    }
}

/// Listing view of a project, without media or comment payloads.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub media_count: usize,
}
