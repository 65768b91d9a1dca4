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

//! Axum HTTP server setup and routing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use rangeway_core::ObjectBackend;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{self, UploadPolicy};
use crate::middleware::metrics_middleware;

/// Default maximum upload size (1GB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 1024 * 1024 * 1024;

/// Default bucket used by the object endpoints.
pub const DEFAULT_BUCKET: &str = "test-bucket";

/// Default validity of presigned URLs (one hour).
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Object storage backend, shared by all requests.
    pub backend: Arc<dyn ObjectBackend>,
    /// Bucket used by `/stream`, `/api/upload` and `/api/download`.
    pub bucket: String,
    /// Maximum upload size in bytes.
    pub max_upload_size: usize,
    /// Validity of presigned URLs.
    pub presign_expiry: Duration,
    /// Accepted upload types.
    pub upload_policy: UploadPolicy,
    /// Prometheus metrics handle for rendering `/metrics` endpoint.
    pub prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates a new application state serving `bucket` from `backend`.
    pub fn new(backend: Arc<dyn ObjectBackend>, bucket: impl Into<String>) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            presign_expiry: DEFAULT_PRESIGN_EXPIRY,
            upload_policy: UploadPolicy::default(),
            prometheus_handle: None,
            start_time: Instant::now(),
        }
    }

    /// Sets the maximum upload size.
    pub fn with_max_upload_size(mut self, max_upload_size: usize) -> Self {
        self.max_upload_size = max_upload_size;
        self
    }

    /// Sets the validity of presigned URLs.
    pub fn with_presign_expiry(mut self, expiry: Duration) -> Self {
        self.presign_expiry = expiry;
        self
    }

    /// Replaces the upload policy.
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload_policy = policy;
        self
    }

    /// Sets the Prometheus handle for rendering metrics.
    pub fn with_prometheus_handle(
        mut self,
        handle: metrics_exporter_prometheus::PrometheusHandle,
    ) -> Self {
        self.prometheus_handle = Some(handle);
        self
    }
}

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    // Browsers playing media cross-origin need the range headers exposed.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any)
        .expose_headers([
            header::CONTENT_RANGE,
            header::ACCEPT_RANGES,
            header::CONTENT_LENGTH,
            header::CONTENT_DISPOSITION,
            header::ETAG,
        ]);

    let api_router = Router::new()
        .route("/buckets", get(handlers::list_buckets))
        .route("/upload", post(handlers::upload_file))
        .route("/download", get(handlers::download_file))
        .route("/presigned-url", get(handlers::presigned_url));

    Router::new()
        .route("/stream", get(handlers::stream_object))
        .nest("/api", api_router)
        // Observability endpoints
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/health", get(handlers::health))
        .layer(cors)
        // Add tracing layer for request logging
        .layer(TraceLayer::new_for_http())
        // Add metrics middleware to record request count and latency
        .layer(middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(state.max_upload_size))
        .with_state(state)
}
