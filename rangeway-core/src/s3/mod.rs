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

//! S3-compatible object backend (MinIO, AWS S3, and friends).
//!
//! Requests use path-style addressing (`/{bucket}/{key}`) and are signed with
//! AWS Signature V4. TLS certificates are always verified.

pub mod signing;
pub mod xml;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, RANGE};
use reqwest::{Client, Method, Response, StatusCode, Url};
use tracing::{debug, warn};

use crate::backend::{empty_stream, ByteStream, ObjectBackend};
use crate::error::BackendError;
use crate::types::{BucketInfo, ObjectMetadata, PutObjectResult};

pub use signing::{Signer, MAX_PRESIGN_EXPIRY_SECS};

/// Region assumed when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3Config {
    /// Host and optional port, without scheme (e.g. `127.0.0.1:9000`).
    pub endpoint: String,
    /// Access key ID.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Use `https` instead of `http`.
    pub use_tls: bool,
    /// Signing region.
    pub region: String,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("use_tls", &self.use_tls)
            .field("region", &self.region)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl S3Config {
    /// Creates a configuration with default region and timeouts.
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        use_tls: bool,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            use_tls,
            region: DEFAULT_REGION.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Base URL of the endpoint, e.g. `http://127.0.0.1:9000`.
    pub fn base_url(&self) -> Result<Url, BackendError> {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(BackendError::InvalidArgument("endpoint is empty".to_string()));
        }
        if endpoint.contains("://") {
            return Err(BackendError::InvalidArgument(format!(
                "endpoint must not include a scheme, use the TLS flag instead: {}",
                endpoint
            )));
        }
        let scheme = if self.use_tls { "https" } else { "http" };
        Url::parse(&format!("{}://{}", scheme, endpoint))
            .map_err(|e| BackendError::InvalidArgument(format!("invalid endpoint: {}", e)))
    }
}

/// Object backend speaking the S3 REST protocol.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
    signer: Signer,
    base_url: String,
    host: String,
    region: String,
}

impl S3Backend {
    /// Creates a backend from connection settings.
    pub fn new(config: S3Config) -> Result<Self, BackendError> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(BackendError::InvalidArgument(
                "access key and secret key are required".to_string(),
            ));
        }

        let url = config.base_url()?;
        let host_name = url
            .host_str()
            .ok_or_else(|| BackendError::InvalidArgument("endpoint has no host".to_string()))?;
        // Url drops default ports, and so does the Host header reqwest sends.
        let host = match url.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };
        let base_url = format!("{}://{}", url.scheme(), host);

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            signer: Signer::new(config.access_key, config.secret_key, config.region.clone()),
            base_url,
            host,
            region: config.region,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bucket_path(bucket: &str) -> String {
        format!("/{}", signing::encode_path(bucket))
    }

    fn object_path(bucket: &str, key: &str) -> Result<String, BackendError> {
        if signing::has_dot_segment(key) {
            return Err(BackendError::InvalidKey {
                key: key.to_string(),
                reason: "'.' and '..' path segments are not addressable".to_string(),
            });
        }
        Ok(format!(
            "/{}/{}",
            signing::encode_path(bucket),
            signing::encode_path(key)
        ))
    }

    /// Signs and sends a request. `headers` are lowercase names and are all signed.
    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: Vec<(&'static str, String)>,
        body: Option<reqwest::Body>,
    ) -> Result<Response, BackendError> {
        let now = Utc::now();
        let mut signed: BTreeMap<String, String> = BTreeMap::new();
        signed.insert("host".to_string(), self.host.clone());
        signed.insert(
            "x-amz-content-sha256".to_string(),
            signing::UNSIGNED_PAYLOAD.to_string(),
        );
        signed.insert("x-amz-date".to_string(), signing::amz_timestamp(now));
        for (name, value) in &headers {
            signed.insert(name.to_string(), value.clone());
        }

        let authorization = self.signer.authorization(
            &signing::SignableRequest {
                method: method.as_str(),
                path,
                query: Vec::new(),
                headers: signed.clone(),
                payload_hash: signing::UNSIGNED_PAYLOAD,
            },
            now,
        );

        let url = format!("{}{}", self.base_url, path);
        debug!("S3 request: {} {}", method, url);

        let mut request = self.client.request(method, &url).header("authorization", authorization);
        for (name, value) in signed.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await.map_err(transport_error)
    }

    /// Converts a non-success response into a [`BackendError`].
    async fn status_error(response: Response, bucket: &str, key: Option<&str>) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let code = xml::parse_error_code(&body);

        match (status, code.as_deref(), key) {
            (_, Some("NoSuchBucket"), _) => BackendError::BucketNotFound {
                bucket: bucket.to_string(),
            },
            (StatusCode::NOT_FOUND, _, Some(key)) => BackendError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            (StatusCode::NOT_FOUND, _, None) => BackendError::BucketNotFound {
                bucket: bucket.to_string(),
            },
            (StatusCode::RANGE_NOT_SATISFIABLE, _, Some(key)) => BackendError::Io(format!(
                "range no longer satisfiable for {}/{}; object changed after HEAD",
                bucket, key
            )),
            (status, code, _) if status.is_server_error() => BackendError::Unavailable(format!(
                "backend returned {}{}",
                status,
                code.map(|c| format!(" ({})", c)).unwrap_or_default()
            )),
            (status, code, _) => BackendError::UnexpectedStatus {
                status: status.as_u16(),
                message: code.map(str::to_string).unwrap_or_else(|| excerpt(&body)),
            },
        }
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    BackendError::Unavailable(err.to_string())
}

/// Buffers an upload body, checking it matches the declared size.
///
/// S3 needs a `Content-Length` up front; uploads are bounded by the API
/// body limit.
async fn collect_body(mut body: ByteStream, size: u64) -> Result<Bytes, BackendError> {
    let mut buf = BytesMut::with_capacity(size.min(16 * 1024 * 1024) as usize);
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
    Ok(buf.freeze())
}

fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn metadata_from_headers(headers: &HeaderMap) -> Result<ObjectMetadata, BackendError> {
    let size = header_str(headers, CONTENT_LENGTH)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| BackendError::Io("HEAD response without Content-Length".to_string()))?;

    Ok(ObjectMetadata {
        size,
        content_type: header_str(headers, CONTENT_TYPE).unwrap_or_default().to_string(),
        etag: header_str(headers, ETAG).map(|v| v.trim_matches('"').to_string()),
        last_modified: header_str(headers, LAST_MODIFIED)
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, BackendError> {
        let response = self
            .send(Method::HEAD, &Self::object_path(bucket, key)?, Vec::new(), None)
            .await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response, bucket, Some(key)).await);
        }
        metadata_from_headers(response.headers())
    }

    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<ByteStream, BackendError> {
        if length == 0 {
            return Ok(empty_stream());
        }

        let last = offset.saturating_add(length - 1);
        let response = self
            .send(
                Method::GET,
                &Self::object_path(bucket, key)?,
                vec![("range", format!("bytes={}-{}", offset, last))],
                None,
            )
            .await?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::OK if offset == 0 => {}
            StatusCode::OK => {
                warn!(
                    "Backend ignored Range header: bucket={}, key={}, offset={}",
                    bucket, key, offset
                );
                return Err(BackendError::Io(
                    "backend returned the full object for a ranged request".to_string(),
                ));
            }
            _ => return Err(Self::status_error(response, bucket, Some(key)).await),
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| BackendError::Io(e.to_string())));
        Ok(Box::pin(stream))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        size: u64,
        content_type: &str,
    ) -> Result<PutObjectResult, BackendError> {
        let data = collect_body(body, size).await?;
        let response = self
            .send(
                Method::PUT,
                &Self::object_path(bucket, key)?,
                vec![("content-type", content_type.to_string())],
                Some(reqwest::Body::from(data)),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response, bucket, None).await);
        }

        Ok(PutObjectResult {
            etag: header_str(response.headers(), ETAG).map(|v| v.trim_matches('"').to_string()),
            size,
        })
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, BackendError> {
        let response = self.send(Method::GET, "/", Vec::new(), None).await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response, "", None).await);
        }
        let body = response.text().await.map_err(|e| BackendError::Io(e.to_string()))?;
        xml::parse_list_buckets(&body)
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, BackendError> {
        let response = self
            .send(Method::HEAD, &Self::bucket_path(bucket), Vec::new(), None)
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::status_error(response, bucket, None).await),
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), BackendError> {
        // us-east-1 rejects an explicit location constraint.
        let body = if self.region == DEFAULT_REGION {
            None
        } else {
            let xml = xml::create_bucket_configuration(&self.region);
            Some(reqwest::Body::from(Bytes::from(xml)))
        };

        let response = self
            .send(Method::PUT, &Self::bucket_path(bucket), Vec::new(), body)
            .await?;
        if !response.status().is_success() {
            return Err(Self::status_error(response, bucket, None).await);
        }
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String, BackendError> {
        let path = Self::object_path(bucket, key)?;
        let query = self
            .signer
            .presign_query("GET", &self.host, &path, expires.as_secs(), Utc::now());
        Ok(format!("{}{}?{}", self.base_url, path, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn config(endpoint: &str, use_tls: bool) -> S3Config {
        S3Config::new(endpoint, "access", "secret", use_tls)
    }

    #[test]
    fn test_base_url_scheme_follows_tls_flag() {
        let backend = S3Backend::new(config("127.0.0.1:9000", false)).unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:9000");
        let backend = S3Backend::new(config("minio.local:9000", true)).unwrap();
        assert_eq!(backend.base_url(), "https://minio.local:9000");
    }

    #[test]
    fn test_default_port_is_dropped() {
        let backend = S3Backend::new(config("minio.local:443", true)).unwrap();
        assert_eq!(backend.base_url(), "https://minio.local");
        assert_eq!(backend.host, "minio.local");
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            S3Backend::new(config("http://127.0.0.1:9000", false)),
            Err(BackendError::InvalidArgument(_))
        ));
        assert!(matches!(
            S3Backend::new(config("", false)),
            Err(BackendError::InvalidArgument(_))
        ));
        assert!(matches!(
            S3Backend::new(S3Config::new("127.0.0.1:9000", "", "", false)),
            Err(BackendError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_object_path_encoding() {
        assert_eq!(
            S3Backend::object_path("test-bucket", "videos/my clip.mp4").unwrap(),
            "/test-bucket/videos/my%20clip.mp4"
        );
    }

    #[test]
    fn test_sent_path_matches_signed_path() {
        let backend = S3Backend::new(config("127.0.0.1:9000", false)).unwrap();
        for key in ["videos/my clip.mp4", "(x)/a+b.png", "a//b.mp4", "..clip/...mp4"] {
            let path = S3Backend::object_path("test-bucket", key).unwrap();
            let request = backend
                .client
                .get(format!("{}{}", backend.base_url(), path))
                .build()
                .unwrap();
            assert_eq!(request.url().path(), path, "key {:?}", key);
        }
    }

    #[test]
    fn test_dot_segment_keys_rejected() {
        for key in ["../other-bucket/secret.mp4", "videos/./clip.mp4", "..", "a/.."] {
            assert!(matches!(
                S3Backend::object_path("test-bucket", key),
                Err(BackendError::InvalidKey { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_presign_rejects_dot_segment_key() {
        let backend = S3Backend::new(config("127.0.0.1:9000", false)).unwrap();
        let err = backend
            .presigned_get_url("test-bucket", "../other-bucket/secret.mp4", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidKey { .. }));
    }

    #[test]
    fn test_config_debug_hides_secret() {
        let cfg = S3Config::new("127.0.0.1:9000", "access", "super-secret", false);
        assert!(!format!("{:?}", cfg).contains("super-secret"));
    }

    #[tokio::test]
    async fn test_presigned_url_shape() {
        let backend = S3Backend::new(config("127.0.0.1:9000", false)).unwrap();
        let url = backend
            .presigned_get_url("test-bucket", "a b.png", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:9000/test-bucket/a%20b.png?X-Amz-Algorithm="));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[test]
    fn test_metadata_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1000"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
        headers.insert(ETAG, HeaderValue::from_static("\"abc123\""));
        headers.insert(
            LAST_MODIFIED,
            HeaderValue::from_static("Mon, 01 Jan 2024 12:00:00 GMT"),
        );

        let meta = metadata_from_headers(&headers).unwrap();
        assert_eq!(meta.size, 1000);
        assert_eq!(meta.content_type, "video/mp4");
        assert_eq!(meta.etag.as_deref(), Some("abc123"));
        assert!(meta.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_collect_body_checks_size() {
        use crate::backend::once_stream;

        let data = collect_body(once_stream(Bytes::from_static(b"hello")), 5).await.unwrap();
        assert_eq!(data, Bytes::from_static(b"hello"));
        assert!(matches!(
            collect_body(once_stream(Bytes::from_static(b"hello")), 6).await,
            Err(BackendError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_metadata_requires_length() {
        assert!(matches!(
            metadata_from_headers(&HeaderMap::new()),
            Err(BackendError::Io(_))
        ));
    }
}
