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

//! Object and bucket descriptors returned by backends.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Content type used when the backend reports none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata of a stored object, fetched once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Object size in bytes.
    pub size: u64,
    /// MIME type as reported by the backend (may be empty).
    pub content_type: String,
    /// Entity tag, without surrounding quotes.
    pub etag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectMetadata {
    /// Creates metadata with only size and content type.
    pub fn new(size: u64, content_type: impl Into<String>) -> Self {
        Self {
            size,
            content_type: content_type.into(),
            etag: None,
            last_modified: None,
        }
    }

    /// Returns the content type, falling back to `application/octet-stream`.
    pub fn content_type_or_default(&self) -> &str {
        if self.content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &self.content_type
        }
    }

    /// Formats `last_modified` as an HTTP date.
    pub fn http_last_modified(&self) -> Option<String> {
        self.last_modified
            .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }
}

/// A bucket as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Creation time, when the backend reports one.
    pub creation_date: Option<DateTime<Utc>>,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectResult {
    /// Entity tag assigned by the backend.
    pub etag: Option<String>,
    /// Number of bytes stored.
    pub size: u64,
}
