// Copyright 2026 Rangeway Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Integration tests for the bucket, upload, download and presign endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use rangeway_api::{create_router, AppState};
use rangeway_core::MemoryBackend;
use tower::ServiceExt;

const BUCKET: &str = "test-bucket";
const BOUNDARY: &str = "rangeway-test-boundary";

fn create_test_state(backend: Arc<MemoryBackend>) -> AppState {
    AppState::new(backend, BUCKET)
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Builds a multipart/form-data body with a single file field.
fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ============================================================================
// Bucket listing
// ============================================================================

#[tokio::test]
async fn test_list_buckets() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert("alpha", "a.png", vec![1u8], "image/png").await;
    backend.insert("beta", "b.png", vec![2u8], "image/png").await;
    let app = create_router(create_test_state(backend));

    let response = app.oneshot(get_request("/api/buckets")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert!(json[0]["creationDate"].is_string());
}

#[tokio::test]
async fn test_list_buckets_empty() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app.oneshot(get_request("/api/buckets")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_creates_bucket_and_stores_object() {
    let backend = Arc::new(MemoryBackend::new());
    let app = create_router(create_test_state(backend.clone()));
    let data = vec![0x89u8, b'P', b'N', b'G', 0, 1, 2, 3];

    let response = app
        .oneshot(upload_request(multipart_body("file", "photo.png", "image/png", &data)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Upload successful");
    assert_eq!(json["file"], "photo.png");

    let stored = backend.object_bytes(BUCKET, "photo.png").await.unwrap();
    assert_eq!(&stored[..], &data[..]);
}

#[tokio::test]
async fn test_upload_then_stream_range() {
    let backend = Arc::new(MemoryBackend::new());
    let app = create_router(create_test_state(backend));
    let data: Vec<u8> = (0..=255u8).cycle().take(2048).collect();

    let response = app
        .clone()
        .oneshot(upload_request(multipart_body("file", "clip.MP4", "video/mp4", &data)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stream?fileName=clip.MP4")
                .header(header::RANGE, "bytes=1024-1535")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &data[1024..1536]);
}

#[tokio::test]
async fn test_upload_rejects_content_type() {
    let backend = Arc::new(MemoryBackend::new());
    let app = create_router(create_test_state(backend.clone()));

    let response = app
        .oneshot(upload_request(multipart_body("file", "notes.png", "text/plain", b"hi")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Invalid file type"));
    assert!(backend.object_bytes(BUCKET, "notes.png").await.is_none());
}

#[tokio::test]
async fn test_upload_rejects_extension() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app
        .oneshot(upload_request(multipart_body("file", "anim.gif", "image/png", b"GIF")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Invalid file extension"));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app
        .oneshot(upload_request(multipart_body("other", "a.png", "image/png", b"x")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_strips_directories_from_file_name() {
    let backend = Arc::new(MemoryBackend::new());
    let app = create_router(create_test_state(backend.clone()));

    let response = app
        .oneshot(upload_request(multipart_body(
            "file",
            "../../etc/shot.jpg",
            "image/jpeg",
            b"jpeg",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["file"], "shot.jpg");
    assert!(backend.object_bytes(BUCKET, "shot.jpg").await.is_some());
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let backend = Arc::new(MemoryBackend::new());
    let state = create_test_state(backend.clone()).with_max_upload_size(1024);
    let app = create_router(state);

    let response = app
        .oneshot(upload_request(multipart_body(
            "file",
            "big.mp4",
            "video/mp4",
            &vec![0u8; 4096],
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(backend.object_bytes(BUCKET, "big.mp4").await.is_none());
}

// ============================================================================
// Download
// ============================================================================

#[tokio::test]
async fn test_download_is_attachment() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .insert(BUCKET, "movie.avi", vec![9u8; 300], "video/x-msvideo")
        .await;
    let app = create_router(create_test_state(backend));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/download?fileName=movie.avi")
                // Downloads always deliver the whole object.
                .header(header::RANGE, "bytes=0-9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"movie.avi\""
    );
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "300");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.len(), 300);
}

#[tokio::test]
async fn test_download_missing_object() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app
        .oneshot(get_request("/api/download?fileName=nope.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_download_missing_param() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app.oneshot(get_request("/api/download")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Presigned URLs
// ============================================================================

#[tokio::test]
async fn test_presigned_url_default_bucket() {
    let state = create_test_state(Arc::new(MemoryBackend::new()))
        .with_presign_expiry(Duration::from_secs(600));
    let app = create_router(state);

    let response = app
        .oneshot(get_request("/api/presigned-url?fileName=a.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["url"], "memory://test-bucket/a.png?expires=600");
    assert_eq!(json["expiresIn"], 600);
}

#[tokio::test]
async fn test_presigned_url_explicit_bucket() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app
        .oneshot(get_request("/api/presigned-url?fileName=a.png&bucketID=media"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["url"]
        .as_str()
        .unwrap()
        .starts_with("memory://media/a.png"));
}

#[tokio::test]
async fn test_presigned_url_requires_file_name() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app
        .oneshot(get_request("/api/presigned-url?bucketID=media"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("fileName"));
}

// ============================================================================
// Health and CORS
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_router(create_test_state(Arc::new(MemoryBackend::new())));

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_cors_exposes_range_headers() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert(BUCKET, "v.mp4", vec![0u8; 10], "video/mp4").await;
    let app = create_router(create_test_state(backend));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stream?fileName=v.mp4")
                .header(header::ORIGIN, "http://player.example")
                .header(header::RANGE, "bytes=0-4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let exposed = response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("content-range"));
    assert!(exposed.contains("accept-ranges"));
}
