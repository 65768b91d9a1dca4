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

//! In-memory object backend.
//!
//! Keeps every object in RAM. Used by the integration tests and for local
//! runs without an object store (`RANGEWAY_BACKEND=memory`).

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::backend::{empty_stream, ByteStream, ObjectBackend};
use crate::error::BackendError;
use crate::types::{BucketInfo, ObjectMetadata, PutObjectResult};

/// Default size of the chunks emitted by [`MemoryBackend::get_object_range`].
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    etag: String,
    modified_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryBucket {
    created_at: Option<DateTime<Utc>>,
    objects: HashMap<String, StoredObject>,
}

/// Object backend holding buckets and objects in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    buckets: RwLock<BTreeMap<String, MemoryBucket>>,
    chunk_size: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Creates an empty backend emitting streams in chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Stores an object, creating the bucket if needed.
    pub async fn insert(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> PutObjectResult {
        let data = data.into();
        let etag = compute_etag(&data);
        let size = data.len() as u64;
        let mut buckets = self.buckets.write().await;
        let entry = buckets.entry(bucket.to_string()).or_insert_with(|| MemoryBucket {
            created_at: Some(Utc::now()),
            objects: HashMap::new(),
        });
        entry.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                etag: etag.clone(),
                modified_at: Utc::now(),
            },
        );
        PutObjectResult {
            etag: Some(etag),
            size,
        }
    }

    /// Returns a copy of a stored object's bytes.
    pub async fn object_bytes(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket)?.objects.get(key).map(|o| o.data.clone())
    }

    async fn object(&self, bucket: &str, key: &str) -> Result<StoredObject, BackendError> {
        let buckets = self.buckets.read().await;
        let b = buckets.get(bucket).ok_or_else(|| BackendError::BucketNotFound {
            bucket: bucket.to_string(),
        })?;
        b.objects.get(key).cloned().ok_or_else(|| BackendError::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

fn compute_etag(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(&digest[..16])
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, BackendError> {
        let object = self.object(bucket, key).await?;
        Ok(ObjectMetadata {
            size: object.data.len() as u64,
            content_type: object.content_type,
            etag: Some(object.etag),
            last_modified: Some(object.modified_at),
        })
    }

    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<ByteStream, BackendError> {
        let object = self.object(bucket, key).await?;
        if length == 0 {
            return Ok(empty_stream());
        }

        let size = object.data.len() as u64;
        if offset >= size {
            return Err(BackendError::InvalidArgument(format!(
                "offset {} beyond object size {}",
                offset, size
            )));
        }
        let end = offset.saturating_add(length).min(size);
        let window = object.data.slice(offset as usize..end as usize);

        let chunk_size = self.chunk_size;
        let chunks: Vec<Bytes> = (0..window.len())
            .step_by(chunk_size)
            .map(|at| window.slice(at..(at + chunk_size).min(window.len())))
            .collect();
        Ok(Box::pin(stream::iter(
            chunks.into_iter().map(Ok::<Bytes, BackendError>),
        )))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: ByteStream,
        size: u64,
        content_type: &str,
    ) -> Result<PutObjectResult, BackendError> {
        if !self.bucket_exists(bucket).await? {
            return Err(BackendError::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        if buf.len() as u64 != size {
            return Err(BackendError::InvalidArgument(format!(
                "declared size {} does not match body size {}",
                size,
                buf.len()
            )));
        }

        Ok(self.insert(bucket, key, buf.freeze(), content_type).await)
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, BackendError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .map(|(name, b)| BucketInfo {
                name: name.clone(),
                creation_date: b.created_at,
            })
            .collect())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_insert_with(|| MemoryBucket {
            created_at: Some(Utc::now()),
            objects: HashMap::new(),
        });
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String, BackendError> {
        Ok(format!(
            "memory://{}/{}?expires={}",
            bucket,
            key,
            expires.as_secs()
        ))
    }
}
