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

//! Bucket listing, upload, download and presigned URL handlers.

use std::path::Path;

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use rangeway_core::{once_stream, BucketInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::stream::{serve_object, ServeOptions};
use crate::errors::ApiError;
use crate::server::AppState;

/// Name of the multipart form field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Content types and file extensions accepted by `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Allowed MIME types, lowercase.
    pub content_types: Vec<String>,
    /// Allowed extensions including the dot, lowercase.
    pub extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            content_types: ["image/png", "image/jpeg", "video/mp4", "video/x-msvideo"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extensions: [".png", ".jpg", ".jpeg", ".mp4", ".avi"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    /// Checks a file against the policy.
    pub fn check(&self, file_name: &str, content_type: &str) -> Result<(), ApiError> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if !self.content_types.iter().any(|t| *t == content_type) {
            return Err(ApiError::BadRequest(format!(
                "Invalid file type '{}'. Allowed types: {}",
                content_type,
                self.content_types.join(", ")
            )));
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        if !self.extensions.iter().any(|e| *e == extension) {
            return Err(ApiError::BadRequest(format!(
                "Invalid file extension. Allowed extensions: {}",
                self.extensions.join(", ")
            )));
        }

        Ok(())
    }
}

/// Response for a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Fixed confirmation message.
    pub message: String,
    /// Stored object key.
    pub file: String,
}

/// Query parameters for `GET /api/download`.
#[derive(Debug, Deserialize, Default)]
pub struct DownloadQuery {
    /// Object key.
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// Query parameters for `GET /api/presigned-url`.
#[derive(Debug, Deserialize, Default)]
pub struct PresignQuery {
    /// Object key.
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    /// Bucket, defaults to the configured one.
    #[serde(rename = "bucketID")]
    pub bucket_id: Option<String>,
}

/// Response for `GET /api/presigned-url`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    /// Presigned GET URL.
    pub url: String,
    /// Validity in seconds.
    pub expires_in: u64,
}

/// Handler for `GET /api/buckets`.
pub async fn list_buckets(State(state): State<AppState>) -> Result<Json<Vec<BucketInfo>>, ApiError> {
    let buckets = state.backend.list_buckets().await?;
    debug!("ListBuckets: {} buckets", buckets.len());
    Ok(Json(buckets))
}

/// Handler for `POST /api/upload`.
///
/// Stores the `file` field of a multipart form under its file name in the
/// configured bucket, creating the bucket when it does not exist yet.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(object_key_from_file_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no file name".to_string()))?;
        let content_type = field.content_type().unwrap_or_default().to_string();

        state.upload_policy.check(&file_name, &content_type)?;

        let data = field.bytes().await.map_err(multipart_error)?;
        let size = data.len() as u64;

        if !state.backend.bucket_exists(&state.bucket).await? {
            info!("Creating bucket {}", state.bucket);
            state.backend.make_bucket(&state.bucket).await?;
        }

        let result = state
            .backend
            .put_object(&state.bucket, &file_name, once_stream(data), size, &content_type)
            .await?;

        info!(
            "Uploaded {}/{} ({} bytes, etag {:?})",
            state.bucket, file_name, result.size, result.etag
        );

        return Ok(Json(UploadResponse {
            message: "Upload successful".to_string(),
            file: file_name,
        }));
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

/// Handler for `GET /api/download?fileName=<key>`.
///
/// Sends the full object as an attachment. The body is streamed from the
/// backend, never buffered.
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = query
        .file_name
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::missing_param("fileName"))?;

    serve_object(
        &state,
        &state.bucket,
        &key,
        &headers,
        &ServeOptions::download(&key),
    )
    .await
}

/// Handler for `GET /api/presigned-url?fileName=<key>[&bucketID=<bucket>]`.
pub async fn presigned_url(
    State(state): State<AppState>,
    Query(query): Query<PresignQuery>,
) -> Result<Json<PresignResponse>, ApiError> {
    let key = query
        .file_name
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::missing_param("fileName"))?;
    let bucket = query
        .bucket_id
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| state.bucket.clone());

    let url = state
        .backend
        .presigned_get_url(&bucket, &key, state.presign_expiry)
        .await?;
    debug!("Presigned GET for {}/{}", bucket, key);

    Ok(Json(PresignResponse {
        url,
        expires_in: state.presign_expiry.as_secs(),
    }))
}

/// Strips any client-side directory components from an uploaded file name.
fn object_key_from_file_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or_default().trim().to_string()
}

fn multipart_error(err: MultipartError) -> ApiError {
    let message = err.body_text();
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload rejected: {}", message);
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::BadRequest(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_accepts_allowed_files() {
        let policy = UploadPolicy::default();
        assert!(policy.check("photo.PNG", "image/png").is_ok());
        assert!(policy.check("photo.jpeg", "IMAGE/JPEG").is_ok());
        assert!(policy.check("clip.avi", "video/x-msvideo").is_ok());
    }

    #[test]
    fn test_policy_rejects_content_type() {
        let policy = UploadPolicy::default();
        let err = policy.check("notes.png", "text/plain").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_policy_rejects_extension() {
        let policy = UploadPolicy::default();
        assert!(policy.check("image.gif", "image/png").is_err());
        assert!(policy.check("no_extension", "image/png").is_err());
    }

    #[test]
    fn test_object_key_from_file_name() {
        assert_eq!(object_key_from_file_name("clip.mp4"), "clip.mp4");
        assert_eq!(object_key_from_file_name("dir/sub/clip.mp4"), "clip.mp4");
        assert_eq!(object_key_from_file_name("C:\\Users\\me\\a.png"), "a.png");
        assert_eq!(object_key_from_file_name("dir/"), "");
    }
}
