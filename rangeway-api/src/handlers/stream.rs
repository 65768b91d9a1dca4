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

//! Range-aware object streaming.
//!
//! Every request runs the same sequence: fetch metadata, parse the `Range`
//! header, resolve the byte window, then either answer 404/416 or write the
//! final headers and stream exactly the window from the backend.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use rangeway_core::{parse_range, resolve_window, ObjectMetadata, ResolvedWindow};
use serde::Deserialize;
use tracing::{debug, info};

use crate::body::WindowedStream;
use crate::errors::ApiError;
use crate::server::AppState;

/// Query parameters for `GET /stream`.
#[derive(Debug, Deserialize, Default)]
pub struct StreamQuery {
    /// Object key.
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// How the response for an object is presented to the client.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Honor the `Range` header. When false the full object is always sent.
    pub honor_range: bool,
    /// Overrides the stored content type.
    pub content_type: Option<&'static str>,
    /// Sets `Content-Disposition: attachment` with this file name.
    pub attachment: Option<String>,
}

impl ServeOptions {
    /// Options for the range streaming endpoint.
    pub fn streaming() -> Self {
        Self {
            honor_range: true,
            ..Self::default()
        }
    }

    /// Options for a full-object download.
    pub fn download(file_name: &str) -> Self {
        Self {
            honor_range: false,
            content_type: Some("application/octet-stream"),
            attachment: Some(file_name.to_string()),
        }
    }
}

/// Handler for `GET /stream?fileName=<key>`.
///
/// # Returns
/// - 200 OK with the full object when no usable `Range` header is present
/// - 206 Partial Content with `Content-Range` for a satisfiable range
/// - 416 Range Not Satisfiable with `Content-Range: bytes */<size>`
/// - 404 Not Found if the object doesn't exist
pub async fn stream_object(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = query
        .file_name
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::missing_param("fileName"))?;

    let result = serve_object(
        &state,
        &state.bucket,
        &key,
        &headers,
        &ServeOptions::streaming(),
    )
    .await;

    let status = match &result {
        Ok(response) => response.status(),
        Err(err) => err.status_code(),
    };
    metrics::counter!("stream_responses_total", "status" => status.as_u16().to_string())
        .increment(1);

    result
}

/// Serves one object, honoring the `Range` header when `options` allow it.
///
/// Headers are complete when this returns; the body is pulled from the
/// backend only as the client reads it.
pub async fn serve_object(
    state: &AppState,
    bucket: &str,
    key: &str,
    headers: &HeaderMap,
    options: &ServeOptions,
) -> Result<Response, ApiError> {
    let metadata = state.backend.head_object(bucket, key).await?;

    let spec = if options.honor_range {
        headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                let spec = parse_range(v, metadata.size);
                if spec.is_none() {
                    debug!("Ignoring unusable Range header {:?} for {}/{}", v, bucket, key);
                }
                spec
            })
    } else {
        None
    };

    let window = resolve_window(spec.as_ref(), metadata.size).map_err(|err| {
        debug!(
            "Unsatisfiable range for {}/{} (size {}): {:?}",
            bucket, key, metadata.size, spec
        );
        ApiError::from(err)
    })?;

    let stream = state
        .backend
        .get_object_range(bucket, key, window.start, window.length)
        .await?;

    info!(
        "Streaming {}/{}: status={}, bytes {}-{} ({} of {})",
        bucket,
        key,
        if window.is_partial { 206 } else { 200 },
        window.start,
        window.end,
        window.length,
        metadata.size
    );

    let body = Body::from_stream(WindowedStream::new(
        stream,
        window.length,
        format!("{}/{}", bucket, key),
    ));

    build_response(&metadata, &window, options, body)
}

fn build_response(
    metadata: &ObjectMetadata,
    window: &ResolvedWindow,
    options: &ServeOptions,
    body: Body,
) -> Result<Response, ApiError> {
    let status = if window.is_partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let content_type = match options.content_type {
        Some(content_type) => content_type,
        None => metadata.content_type_or_default(),
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, window.length)
        .header(header::ACCEPT_RANGES, "bytes");

    if window.is_partial {
        builder = builder.header(header::CONTENT_RANGE, window.content_range(metadata.size));
    }
    if let Some(etag) = metadata.etag.as_deref() {
        // Backends may return values that are not valid header text.
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag.trim_matches('"'))) {
            builder = builder.header(header::ETAG, value);
        }
    }
    if let Some(last_modified) = metadata.http_last_modified() {
        builder = builder.header(header::LAST_MODIFIED, last_modified);
    }
    if let Some(file_name) = options.attachment.as_deref() {
        builder = builder.header(header::CONTENT_DISPOSITION, content_disposition(file_name));
    }

    builder
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// Builds an `attachment` disposition, quoting the file name.
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
