use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use crate::api::{ApiContext, Result};
use crate::entities::{Comment, CommentId, MediaId, NewComment, ProjectId};

pub fn router() -> Router {
    Router::new()
        .route("/api/projects/:project_id/media/:media_id/comments", post(add_comment))
        .route("/api/projects/:project_id/media/:media_id/comments/:comment_id", delete(delete_comment))
}

async fn add_comment(
    ctx: Extension<ApiContext>,
    Path((project_id, media_id)): Path<(ProjectId, MediaId)>,
    Json(req): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = ctx.service.add_comment(&project_id, &media_id, req).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    ctx: Extension<ApiContext>,
    Path((project_id, media_id, comment_id)): Path<(ProjectId, MediaId, CommentId)>,
) -> Result<StatusCode> {
    ctx.service.delete_comment(&project_id, &media_id, &comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
