use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Extension, Multipart, Path};
use axum::http::StatusCode;
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use crate::api::{ApiContext, ApiError, Result};
use crate::entities::{Media, MediaId, ProjectId, UploadFile};
use crate::utils::file_utils::content_type_or_guess;

pub fn router(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/projects/:project_id/media", post(upload_media))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .route("/api/projects/:project_id/media/order", put(reorder_media))
        .route("/api/projects/:project_id/media/:media_id", delete(delete_media))
}

#[derive(serde::Deserialize, Debug)]
struct ReorderBody {
    media_ids: Vec<MediaId>,
}

fn multipart_error(error: MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    ApiError::unprocessable_entity([("files", format!("multipart error: {}", error.body_text()))])
}

/// Drains the multipart body into the upload queue. Only `files` parts count.
async fn read_upload_queue(mut multipart: Multipart, max_files: usize) -> Result<Vec<UploadFile>> {
    let mut queue = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("files") {
            continue;
        }
        if queue.len() == max_files {
            return Err(ApiError::unprocessable_entity([("files", format!("at most {} files per upload", max_files))]));
        }

        let file_name = field.file_name()
            .filter(|x| !x.is_empty())
            .ok_or(ApiError::unprocessable_entity([("files", "filename is empty")]))?
            .to_string();
        let content_type = content_type_or_guess(&file_name, field.content_type());
        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
        queue.push(UploadFile { file_name, content_type, bytes });
    }
    if queue.is_empty() {
        return Err(ApiError::unprocessable_entity([("files", "missing file")]));
    }
    Ok(queue)
}

async fn upload_media(
    ctx: Extension<ApiContext>,
    Path(project_id): Path<ProjectId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Media>>)> {
    let queue = read_upload_queue(multipart, ctx.service.max_files_per_upload()).await?;
    let media = ctx.service.upload_media(&project_id, queue).await?;
    Ok((StatusCode::CREATED, Json(media)))
}

async fn reorder_media(
    ctx: Extension<ApiContext>,
    Path(project_id): Path<ProjectId>,
    Json(req): Json<ReorderBody>,
) -> Result<StatusCode> {
    ctx.service.reorder_media(&project_id, &req.media_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_media(
    ctx: Extension<ApiContext>,
    Path((project_id, media_id)): Path<(ProjectId, MediaId)>,
) -> Result<StatusCode> {
    ctx.service.delete_media(&project_id, &media_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
