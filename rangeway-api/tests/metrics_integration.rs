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

//! Integration tests for the metrics endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use rangeway_api::{create_router, AppState};
use rangeway_core::MemoryBackend;
use tower::ServiceExt;

async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_metrics_disabled_returns_503() {
    let app = create_router(AppState::new(Arc::new(MemoryBackend::new()), "test-bucket"));

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Without a Prometheus handle in the state the endpoint is disabled.
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_prometheus_metrics_with_recorder() {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install recorder");

    let backend = Arc::new(MemoryBackend::new());
    backend
        .insert("test-bucket", "v.mp4", vec![7u8; 1000], "video/mp4")
        .await;
    let state = AppState::new(backend, "test-bucket").with_prometheus_handle(handle);
    let app = create_router(state);

    // Generate some traffic first.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/stream?fileName=v.mp4")
                .header(header::RANGE, "bytes=0-99")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let _ = body_to_string(response.into_body()).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("http_requests_total"));
    assert!(body.contains("stream_responses_total"));
    assert!(body.contains("stream_bytes_sent_total"));
}
