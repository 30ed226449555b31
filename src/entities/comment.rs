use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type CommentId = Uuid;

pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// A pin on a media item. `x` and `y` are percentages of the media canvas.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq, Default)]
pub struct NewComment {
    pub x: f64,
    pub y: f64,
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl NewComment {
    /// Builds the stored comment; a missing or blank author becomes the placeholder.
    pub fn into_comment(self) -> Comment {
        let author = self.author
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());
        Comment {
            id: Uuid::new_v4(),
            x: self.x,
            y: self.y,
            text: self.text.trim().to_string(),
            author,
            created_at: Utc::now(),
        }
    }
}
