use std::fmt::{Display, Formatter};
use std::str::FromStr;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::entities::Comment;

pub type MediaId = Uuid;

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classifies an upload by its declared content type.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.trim().to_ascii_lowercase().starts_with("video/") {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            _ => Err(format!("unknown media type: {s}")),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Media {
    pub id: MediaId,
    pub url: String,
    /// Blob-store public id. Absent on records written before it was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MediaType,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// A media row that has not been placed in a project yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMedia {
    pub url: String,
    pub blob_id: Option<String>,
    pub kind: MediaType,
}

impl NewMedia {
    pub fn into_media(self, position: i64) -> Media {
        Media {
            id: Uuid::new_v4(),
            url: self.url,
            blob_id: self.blob_id,
            kind: self.kind,
            position,
            created_at: Utc::now(),
            comments: vec![],
        }
    }
}

/// One file of an upload batch, as received from the client.
#[derive(Clone, Debug, Default)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn kind(&self) -> MediaType {
        MediaType::from_content_type(&self.content_type)
    }
}
