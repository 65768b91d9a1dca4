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

//! API error types and responses.
//!
//! Every error is rendered as a JSON body `{"error": "<message>"}` with the
//! matching HTTP status, except 416 which carries only `Content-Range`.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rangeway_core::{BackendError, RangeNotSatisfiable};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The object or bucket does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The requested byte range lies outside the object.
    #[error("Requested range not satisfiable")]
    RangeNotSatisfiable(RangeNotSatisfiable),

    /// The request is invalid.
    #[error("{0}")]
    BadRequest(String),

    /// The request body exceeds the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The storage backend failed for a reason other than a missing object.
    #[error("{0}")]
    Backend(BackendError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// Returns a stable error code, used in logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::RangeNotSatisfiable(_) => "RangeNotSatisfiable",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::PayloadTooLarge(_) => "PayloadTooLarge",
            ApiError::Backend(BackendError::Unavailable(_)) => "BackendUnavailable",
            ApiError::Backend(_) => "BackendError",
            ApiError::Internal(_) => "InternalError",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RangeNotSatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Backend(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds a 400 error for a missing query parameter.
    pub fn missing_param(name: &str) -> Self {
        ApiError::BadRequest(format!("Missing required query parameter '{}'", name))
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else if matches!(err, BackendError::InvalidKey { .. }) {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Backend(err)
        }
    }
}

impl From<RangeNotSatisfiable> for ApiError {
    fn from(err: RangeNotSatisfiable) -> Self {
        ApiError::RangeNotSatisfiable(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ApiError::RangeNotSatisfiable(err) = &self {
            return Response::builder()
                .status(status)
                .header(header::CONTENT_RANGE, err.content_range())
                .header(header::CONTENT_LENGTH, 0)
                .body(Body::empty())
                .unwrap_or_else(|_| status.into_response());
        }

        if status.is_server_error() {
            error!("Request failed ({}): {}", self.code(), self);
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
