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

//! Rangeway Core - Byte-range resolution and object-storage backends.
//!
//! This crate provides:
//! - HTTP `Range` parsing and window resolution ([`range`])
//! - The [`ObjectBackend`] trait with a pull-based [`ByteStream`]
//! - An S3-compatible backend signed with AWS Signature V4 ([`s3`])
//! - An in-memory backend for tests and local runs ([`memory`])

pub mod backend;
pub mod error;
pub mod memory;
pub mod range;
pub mod s3;
pub mod types;

pub use backend::{empty_stream, once_stream, ByteStream, ObjectBackend};
pub use error::BackendError;
pub use memory::MemoryBackend;
pub use range::{parse_range, resolve_window, RangeNotSatisfiable, RangeSpec, ResolvedWindow};
pub use s3::{S3Backend, S3Config};
pub use types::{BucketInfo, ObjectMetadata, PutObjectResult, DEFAULT_CONTENT_TYPE};
