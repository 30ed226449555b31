use axum::Router;

mod comments;
mod media;
mod ping;
mod projects;

pub fn router(max_upload_bytes: usize) -> Router {
    ping::router()
        .merge(projects::router())
        .merge(media::router(max_upload_bytes))
        .merge(comments::router())
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use axum::Router;
    use tower::ServiceExt;
    use crate::api::{app, ApiContext};
    use crate::config::ApiConfig;
    use crate::service::tests::TestBlobStore;
    use crate::service::ProjectService;
    use crate::storage::DocumentStorage;

    pub const BOUNDARY: &str = "proofed-test-boundary";

    pub fn test_app(max_upload_bytes: usize) -> Router {
        let storage = Arc::new(DocumentStorage::default());
        let blobs = Arc::new(TestBlobStore::default());
        let service = ProjectService::new(storage, blobs, "proofed".to_string(), 3);
        let ctx = ApiContext {
            cfg: Arc::new(ApiConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
                max_upload_bytes,
                max_files_per_upload: 3,
            }),
            service: Arc::new(service),
        };
        app(ctx, None)
    }

    pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    /// `files` are (file name, content type, bytes).
    pub fn multipart_request(uri: &str, files: &[(&str, &str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (file_name, content_type, bytes) in files {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(format!("Content-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n").as_bytes());
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    pub async fn json_body(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub async fn create_project(app: &Router, title: &str) -> String {
        let response = send(app, json_request("POST", "/api/projects", serde_json::json!({ "title": title }))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["id"].as_str().unwrap().to_string()
    }
}
