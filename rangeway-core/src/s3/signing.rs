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

//! AWS Signature Version 4 request signing.
//!
//! Signs outgoing requests to an S3-compatible backend, either with an
//! `Authorization` header or as a presigned URL query string.
//! Based on: <https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html>

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash used when the body is not hashed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Longest expiry S3 accepts for a presigned URL (7 days).
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// A request as seen by the signer.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    /// HTTP method, e.g. `GET`.
    pub method: &'a str,
    /// Already percent-encoded URI path, starting with `/`.
    pub path: &'a str,
    /// Decoded query parameters.
    pub query: Vec<(String, String)>,
    /// Headers to sign, keyed by lowercase name. Must include `host`.
    pub headers: BTreeMap<String, String>,
    /// Hex SHA-256 of the body, or [`UNSIGNED_PAYLOAD`].
    pub payload_hash: &'a str,
}

/// Signs requests with one set of credentials.
#[derive(Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key", &self.access_key)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Creates a signer for the `s3` service.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: "s3".to_string(),
        }
    }

    /// Computes the `Authorization` header for `request` at time `now`.
    ///
    /// The request headers must already contain `x-amz-date` formatted from
    /// the same `now`.
    pub fn authorization(&self, request: &SignableRequest<'_>, now: DateTime<Utc>) -> String {
        let date = now.format("%Y%m%d").to_string();
        let timestamp = amz_timestamp(now);
        let signed_headers = signed_header_names(&request.headers);

        let canonical_request = canonical_request(
            request.method,
            request.path,
            &canonical_query_string(&request.query),
            &request.headers,
            &signed_headers,
            request.payload_hash,
        );
        let string_to_sign = self.string_to_sign(&timestamp, &date, &canonical_request);
        let signature = calculate_signature(&self.signing_key(&date), &string_to_sign);

        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.access_key,
            self.credential_scope(&date),
            signed_headers,
            signature
        )
    }

    /// Builds the query string of a presigned URL (only `host` is signed).
    ///
    /// `expires_secs` is clamped to `1..=MAX_PRESIGN_EXPIRY_SECS`.
    pub fn presign_query(
        &self,
        method: &str,
        host: &str,
        path: &str,
        expires_secs: u64,
        now: DateTime<Utc>,
    ) -> String {
        let date = now.format("%Y%m%d").to_string();
        let timestamp = amz_timestamp(now);
        let expires = expires_secs.clamp(1, MAX_PRESIGN_EXPIRY_SECS);

        let query = vec![
            ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
            (
                "X-Amz-Credential".to_string(),
                format!("{}/{}", self.access_key, self.credential_scope(&date)),
            ),
            ("X-Amz-Date".to_string(), timestamp.clone()),
            ("X-Amz-Expires".to_string(), expires.to_string()),
            ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
        ];

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host.to_string());

        let canonical_query = canonical_query_string(&query);
        let canonical_request = canonical_request(
            method,
            path,
            &canonical_query,
            &headers,
            "host",
            UNSIGNED_PAYLOAD,
        );
        let string_to_sign = self.string_to_sign(&timestamp, &date, &canonical_request);
        let signature = calculate_signature(&self.signing_key(&date), &string_to_sign);

        format!("{}&X-Amz-Signature={}", canonical_query, signature)
    }

    fn credential_scope(&self, date: &str) -> String {
        format!("{}/{}/{}/aws4_request", date, self.region, self.service)
    }

    /// Creates string to sign.
    ///
    /// Format:
    /// ```text
    /// AWS4-HMAC-SHA256
    /// TIMESTAMP
    /// DATE/REGION/SERVICE/aws4_request
    /// HASH(CANONICAL_REQUEST)
    /// ```
    fn string_to_sign(&self, timestamp: &str, date: &str, canonical_request: &str) -> String {
        let hashed_request = format!("{:x}", Sha256::digest(canonical_request.as_bytes()));
        format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            self.credential_scope(date),
            hashed_request
        )
    }

    fn signing_key(&self, date: &str) -> Vec<u8> {
        calculate_signing_key(&self.secret_key, date, &self.region, &self.service)
    }
}

/// Formats `now` as `YYYYMMDDTHHMMSSZ`.
pub fn amz_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Creates canonical request string.
///
/// Format:
/// ```text
/// METHOD
/// CANONICAL_URI
/// CANONICAL_QUERY_STRING
/// CANONICAL_HEADERS
///
/// SIGNED_HEADERS
/// PAYLOAD_HASH
/// ```
fn canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    headers: &BTreeMap<String, String>,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    let canonical_headers: Vec<String> = headers
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v.split_whitespace().collect::<Vec<_>>().join(" ")))
        .collect();

    format!(
        "{}\n{}\n{}\n{}\n\n{}\n{}",
        method,
        canonical_uri,
        canonical_query,
        canonical_headers.join("\n"),
        signed_headers,
        payload_hash
    )
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    headers.keys().map(String::as_str).collect::<Vec<_>>().join(";")
}

/// Canonicalizes query parameters (sorted by name then value, percent-encoded).
pub fn canonical_query_string(params: &[(String, String)]) -> String {
    let mut params: Vec<&(String, String)> = params.iter().collect();
    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns true when any `/`-separated segment of `key` is `.` or `..`.
///
/// URL parsers collapse such segments (including their `%2E` spellings)
/// before the request leaves the client, so they cannot be signed verbatim.
pub fn has_dot_segment(key: &str) -> bool {
    key.split('/').any(|segment| segment == "." || segment == "..")
}

/// Percent-encodes an object key for use in a URI path, keeping `/` separators.
pub fn encode_path(key: &str) -> String {
    key.split('/').map(percent_encode).collect::<Vec<_>>().join("/")
}

/// Calculates signing key using HMAC-SHA256 chain.
///
/// kSecret = secret access key
/// kDate = HMAC-SHA256(kSecret, date)
/// kRegion = HMAC-SHA256(kDate, region)
/// kService = HMAC-SHA256(kRegion, service)
/// kSigning = HMAC-SHA256(kService, "aws4_request")
fn calculate_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn calculate_signature(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

/// Percent-encodes a string (RFC 3986).
///
/// Only unreserved characters (A-Z, a-z, 0-9, -, _, ., ~) are NOT encoded.
fn percent_encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    encoded
}
