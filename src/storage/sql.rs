use std::str::FromStr;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;
use uuid::Uuid;
use crate::entities::{Comment, CommentId, Media, MediaId, MediaType, NewMedia, Project, ProjectId, ProjectSummary};
use crate::storage::{Storage, StorageError};

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS media (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        url TEXT NOT NULL,
        blob_id TEXT,
        type TEXT NOT NULL CHECK (type IN ('image', 'video')),
        position INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        media_id TEXT NOT NULL REFERENCES media(id) ON DELETE CASCADE,
        x REAL NOT NULL,
        y REAL NOT NULL,
        text TEXT NOT NULL,
        author TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_media_project_id ON media(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_media_id ON comments(media_id)",
    "CREATE INDEX IF NOT EXISTS idx_media_position ON media(project_id, position)",
];

/// Relational store: normalized tables, cascades done by foreign keys.
#[derive(Clone)]
pub struct SqlStorage {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProjectSummaryRow {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    media_count: i64,
}

#[derive(sqlx::FromRow)]
struct MediaRow {
    id: String,
    url: String,
    blob_id: Option<String>,
    kind: String,
    position: i64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: String,
    media_id: String,
    x: f64,
    y: f64,
    text: String,
    author: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_id(value: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(value).map_err(|e| StorageError::corrupted(format!("invalid id '{value}': {e}")))
}

impl TryFrom<ProjectSummaryRow> for ProjectSummary {
    type Error = StorageError;

    fn try_from(row: ProjectSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&row.id)?,
            title: row.title,
            created_at: row.created_at,
            media_count: row.media_count.max(0) as usize,
        })
    }
}

impl TryFrom<MediaRow> for Media {
    type Error = StorageError;

    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&row.id)?,
            url: row.url,
            blob_id: row.blob_id,
            kind: MediaType::from_str(&row.kind).map_err(StorageError::corrupted)?,
            position: row.position,
            created_at: row.created_at,
            comments: vec![],
        })
    }
}

impl TryFrom<CommentRow> for Comment {
    type Error = StorageError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&row.id)?,
            x: row.x,
            y: row.y,
            text: row.text,
            author: row.author.unwrap_or_else(|| crate::entities::ANONYMOUS_AUTHOR.to_string()),
            created_at: row.created_at,
        })
    }
}

impl SqlStorage {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // every connection to `:memory:` is its own database
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };
        Ok(Self { pool })
    }

    async fn project_exists(&self, id: &ProjectId) -> Result<bool, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn media_comments(&self, media_id: &MediaId) -> Result<Vec<Comment>, StorageError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT id, media_id, x, y, text, author, created_at FROM comments
             WHERE media_id = ? ORDER BY created_at, id")
            .bind(media_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Comment::try_from).collect()
    }
}

#[async_trait::async_trait]
impl Storage for SqlStorage {
    async fn init(&self) -> Result<(), StorageError> {
        info!("Starting DB migration...");
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("DB Migrated!");
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }

    async fn insert_project(&self, project: &Project) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO projects (id, title, created_at) VALUES (?, ?, ?)")
            .bind(project.id.to_string())
            .bind(&project.title)
            .bind(project.created_at)
            .execute(&mut *tx)
            .await?;
        for media in &project.media {
            sqlx::query("INSERT INTO media (id, project_id, url, blob_id, type, position, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
                .bind(media.id.to_string())
                .bind(project.id.to_string())
                .bind(&media.url)
                .bind(&media.blob_id)
                .bind(media.kind.as_str())
                .bind(media.position)
                .bind(media.created_at)
                .execute(&mut *tx)
                .await?;
            for comment in &media.comments {
                sqlx::query("INSERT INTO comments (id, media_id, x, y, text, author, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
                    .bind(comment.id.to_string())
                    .bind(media.id.to_string())
                    .bind(comment.x)
                    .bind(comment.y)
                    .bind(&comment.text)
                    .bind(&comment.author)
                    .bind(comment.created_at)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, StorageError> {
        let rows: Vec<ProjectSummaryRow> = sqlx::query_as(
            "SELECT p.id, p.title, p.created_at, COUNT(m.id) AS media_count
             FROM projects p LEFT JOIN media m ON m.project_id = p.id
             GROUP BY p.id, p.title, p.created_at
             ORDER BY p.created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ProjectSummary::try_from).collect()
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StorageError> {
        let maybe_row: Option<ProjectRow> = sqlx::query_as("SELECT id, title, created_at FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = maybe_row else { return Ok(None); };

        let media_rows: Vec<MediaRow> = sqlx::query_as(
            "SELECT id, url, blob_id, type AS kind, position, created_at FROM media
             WHERE project_id = ? ORDER BY position, created_at")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await?;
        let comment_rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT c.id, c.media_id, c.x, c.y, c.text, c.author, c.created_at
             FROM comments c JOIN media m ON m.id = c.media_id
             WHERE m.project_id = ? ORDER BY c.created_at, c.id")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut comments_by_media = comment_rows.into_iter()
            .map(|x| (x.media_id.clone(), x))
            .into_group_map();
        let mut media_vec = Vec::with_capacity(media_rows.len());
        for media_row in media_rows {
            let comment_rows = comments_by_media.remove(&media_row.id).unwrap_or_default();
            let mut media = Media::try_from(media_row)?;
            media.comments = comment_rows.into_iter().map(Comment::try_from).collect::<Result<_, _>>()?;
            media_vec.push(media);
        }

        Ok(Some(Project {
            id: parse_id(&row.id)?,
            title: row.title,
            created_at: row.created_at,
            media: media_vec,
        }))
    }

    async fn update_project_title(&self, id: &ProjectId, title: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE projects SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_media(&self, project_id: &ProjectId, media: NewMedia) -> Result<Option<Media>, StorageError> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM projects WHERE id = ?")
            .bind(project_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }
        let (next_position,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(position) + 1, 0) FROM media WHERE project_id = ?")
            .bind(project_id.to_string())
            .fetch_one(&mut *tx)
            .await?;
        let media = media.into_media(next_position);
        sqlx::query("INSERT INTO media (id, project_id, url, blob_id, type, position, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(media.id.to_string())
            .bind(project_id.to_string())
            .bind(&media.url)
            .bind(&media.blob_id)
            .bind(media.kind.as_str())
            .bind(media.position)
            .bind(media.created_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(media))
    }

    async fn get_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<Option<Media>, StorageError> {
        let maybe_row: Option<MediaRow> = sqlx::query_as(
            "SELECT id, url, blob_id, type AS kind, position, created_at FROM media
             WHERE id = ? AND project_id = ?")
            .bind(media_id.to_string())
            .bind(project_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = maybe_row else { return Ok(None); };
        let mut media = Media::try_from(row)?;
        media.comments = self.media_comments(media_id).await?;
        Ok(Some(media))
    }

    async fn delete_media(&self, project_id: &ProjectId, media_id: &MediaId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM media WHERE id = ? AND project_id = ?")
            .bind(media_id.to_string())
            .bind(project_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_media_positions(&self, project_id: &ProjectId, positions: &[(MediaId, i64)]) -> Result<bool, StorageError> {
        if !self.project_exists(project_id).await? {
            return Ok(false);
        }
        let mut tx = self.pool.begin().await?;
        for (media_id, position) in positions {
            sqlx::query("UPDATE media SET position = ? WHERE id = ? AND project_id = ?")
                .bind(position)
                .bind(media_id.to_string())
                .bind(project_id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn insert_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment: &Comment) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO comments (id, media_id, x, y, text, author, created_at)
             SELECT ?, m.id, ?, ?, ?, ?, ? FROM media m WHERE m.id = ? AND m.project_id = ?")
            .bind(comment.id.to_string())
            .bind(comment.x)
            .bind(comment.y)
            .bind(&comment.text)
            .bind(&comment.author)
            .bind(comment.created_at)
            .bind(media_id.to_string())
            .bind(project_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&self, project_id: &ProjectId, media_id: &MediaId, comment_id: &CommentId) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "DELETE FROM comments WHERE id = ? AND media_id IN
             (SELECT id FROM media WHERE id = ? AND project_id = ?)")
            .bind(comment_id.to_string())
            .bind(media_id.to_string())
            .bind(project_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
