use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use crate::api::{ApiContext, ApiError, Result};
use crate::entities::{Project, ProjectId, ProjectSummary};

pub fn router() -> Router {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/:project_id", get(get_project).patch(update_project).delete(delete_project))
        .route("/api/export", get(export))
}

#[derive(serde::Deserialize, Debug)]
struct TitleBody {
    title: String,
}

#[derive(serde::Serialize, Debug)]
struct CreatedResponse {
    id: ProjectId,
}

async fn list_projects(
    ctx: Extension<ApiContext>,
) -> Result<Json<Vec<ProjectSummary>>> {
    let projects = ctx.service.list_projects().await?;
    Ok(Json(projects))
}

async fn create_project(
    ctx: Extension<ApiContext>,
    Json(req): Json<TitleBody>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let project = ctx.service.create_project(&req.title).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: project.id })))
}

async fn get_project(
    ctx: Extension<ApiContext>,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<Project>> {
    let project = ctx.service.get_project(&project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("project not found: {}", project_id)))?;
    Ok(Json(project))
}

async fn update_project(
    ctx: Extension<ApiContext>,
    Path(project_id): Path<ProjectId>,
    Json(req): Json<TitleBody>,
) -> Result<StatusCode> {
    ctx.service.update_project_title(&project_id, &req.title).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_project(
    ctx: Extension<ApiContext>,
    Path(project_id): Path<ProjectId>,
) -> Result<StatusCode> {
    ctx.service.delete_project(&project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export(
    ctx: Extension<ApiContext>,
) -> Result<Json<Vec<Project>>> {
    let projects = ctx.service.export().await?;
    Ok(Json(projects))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use uuid::Uuid;
    use crate::api::controllers::test_utils::*;

    #[tokio::test]
    async fn create_then_get() {
        let app = test_app(1024);
        let id = create_project(&app, "Launch Campaign").await;

        let response = send(&app, empty_request("GET", &format!("/api/projects/{id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let project = json_body(response).await;
        assert_eq!(project["title"], "Launch Campaign");
        assert_eq!(project["media"], json!([]));

        let response = send(&app, empty_request("GET", "/api/projects")).await;
        let listed = json_body(response).await;
        assert_eq!(listed[0]["id"], id.as_str());
        assert_eq!(listed[0]["media_count"], 0);
    }

    #[tokio::test]
    async fn blank_title_is_unprocessable() {
        let app = test_app(1024);
        let response = send(&app, json_request("POST", "/api/projects", json!({ "title": "  " }))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["errors"]["title"].is_array());
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let app = test_app(1024);
        let uri = format!("/api/projects/{}", Uuid::new_v4());
        assert_eq!(send(&app, empty_request("GET", &uri)).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&app, empty_request("DELETE", &uri)).await.status(), StatusCode::NOT_FOUND);
        let response = send(&app, json_request("PATCH", &uri, json!({ "title": "Relaunch" }))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rename_and_delete() {
        let app = test_app(1024);
        let id = create_project(&app, "Launch Campaign").await;
        let uri = format!("/api/projects/{id}");

        let response = send(&app, json_request("PATCH", &uri, json!({ "title": "Relaunch" }))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let project = json_body(send(&app, empty_request("GET", &uri)).await).await;
        assert_eq!(project["title"], "Relaunch");

        assert_eq!(send(&app, empty_request("DELETE", &uri)).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&app, empty_request("GET", &uri)).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_lists_every_tree() {
        let app = test_app(1024);
        create_project(&app, "One").await;
        create_project(&app, "Two").await;
        let exported = json_body(send(&app, empty_request("GET", "/api/export")).await).await;
        assert_eq!(exported.as_array().unwrap().len(), 2);
        assert!(exported[0]["media"].is_array());
    }
}
