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

//! Object-storage backend interface.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, Stream};

use crate::error::BackendError;
use crate::types::{BucketInfo, ObjectMetadata, PutObjectResult};

/// Pull-based stream of object bytes.
///
/// Dropping the stream releases the underlying backend resource (for the
/// S3 backend: the HTTP response and its connection).
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BackendError>> + Send>>;

/// Creates a stream that yields nothing.
pub fn empty_stream() -> ByteStream {
    Box::pin(stream::empty())
}

/// Creates a stream that yields a single buffer.
pub fn once_stream(data: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok(data) }))
}

/// Object-storage operations the proxy depends on.
///
/// Implementations must be safe for concurrent use; the API layer shares a
/// single instance across all requests.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Fetches object size and content type.
    ///
    /// Returns [`BackendError::ObjectNotFound`] when the key does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, BackendError>;

    /// Opens a stream over `length` bytes of the object starting at `offset`.
    ///
    /// A zero `length` yields an empty stream.
    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<ByteStream, BackendError>;

    /// Uploads an object of `size` bytes read from `body`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        size: u64,
        content_type: &str,
    ) -> Result<PutObjectResult, BackendError>;

    /// Lists all buckets visible to the configured credentials.
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, BackendError>;

    /// Checks whether a bucket exists.
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError>;

    /// Creates a bucket.
    async fn make_bucket(&self, bucket: &str) -> Result<(), BackendError>;

    /// Produces a time-limited URL granting GET access to an object.
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String, BackendError>;
}
