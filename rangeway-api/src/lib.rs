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

//! Rangeway API Layer - HTTP range streaming proxy
//!
//! This crate provides the HTTP API layer for Rangeway, including:
//! - Range-aware object streaming (`GET /stream`)
//! - Bucket listing, upload, download and presigned URL endpoints
//! - Structured JSON errors
//! - Middleware for metrics

pub mod body;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use body::WindowedStream;
pub use errors::ApiError;
pub use handlers::{ServeOptions, UploadPolicy};
pub use server::{
    create_router, AppState, DEFAULT_BUCKET, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_PRESIGN_EXPIRY,
};
