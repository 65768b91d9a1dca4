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

//! Configuration management for the Rangeway server.
//!
//! All settings come from `RANGEWAY_*` environment variables. Unset
//! variables fall back to defaults; malformed values abort startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rangeway_core::s3::{DEFAULT_REGION, MAX_PRESIGN_EXPIRY_SECS};

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default S3 endpoint (host and port, no scheme).
pub const DEFAULT_S3_ENDPOINT: &str = "127.0.0.1:9000";
/// Default bucket served by the object endpoints.
pub const DEFAULT_BUCKET: &str = "test-bucket";
/// Default maximum upload size (1GB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 1024 * 1024 * 1024;
/// Default presigned URL validity in seconds.
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server settings (bind address, TLS, upload limit)
    pub server: ServerConfig,
    /// Object storage backend settings
    pub backend: BackendConfig,
    /// Metrics and monitoring configuration
    pub metrics: MetricsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    /// Can be set via RANGEWAY_BIND environment variable.
    pub bind: String,
    /// Maximum upload size in bytes.
    /// Can be set via RANGEWAY_MAX_UPLOAD_SIZE (e.g., "5GB", "100MB", "1024KB").
    pub max_upload_size: usize,
    /// TLS configuration for HTTPS support.
    pub tls: TlsConfig,
}

/// TLS/HTTPS configuration.
///
/// TLS is disabled by default. To enable TLS, set `RANGEWAY_TLS_CERT` and
/// `RANGEWAY_TLS_KEY` to PEM-encoded certificate and private key files.
///
/// Example:
/// ```bash
/// export RANGEWAY_TLS_CERT=/path/to/cert.pem
/// export RANGEWAY_TLS_KEY=/path/to/key.pem
/// ./rangeway
/// ```
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Whether TLS is enabled.
    /// Set to true when both cert_path and key_path are provided.
    pub enabled: bool,
    /// Path to PEM-encoded certificate file.
    pub cert_path: Option<PathBuf>,
    /// Path to PEM-encoded private key file.
    pub key_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Builds the TLS settings from optional certificate and key paths.
    pub fn from_paths(cert_path: Option<PathBuf>, key_path: Option<PathBuf>) -> Self {
        Self {
            enabled: cert_path.is_some() && key_path.is_some(),
            cert_path,
            key_path,
        }
    }

    /// Validates TLS configuration.
    ///
    /// Returns an error if only one of the two paths is set, or if TLS is
    /// enabled but a path is missing.
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled {
            if self.cert_path.is_none() {
                return Err("TLS enabled but RANGEWAY_TLS_CERT is not set".to_string());
            }
            if self.key_path.is_none() {
                return Err("TLS enabled but RANGEWAY_TLS_KEY is not set".to_string());
            }
        } else if self.cert_path.is_some() != self.key_path.is_some() {
            return Err(
                "RANGEWAY_TLS_CERT and RANGEWAY_TLS_KEY must be set together".to_string(),
            );
        }
        Ok(())
    }
}

/// Which object backend serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// S3-compatible object store reached over HTTP.
    S3,
    /// Process-local in-memory store.
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(BackendKind::S3),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("Unknown backend '{}', expected 's3' or 'memory'", other)),
        }
    }
}

/// Object storage backend configuration.
#[derive(Clone)]
pub struct BackendConfig {
    /// Backend implementation (RANGEWAY_BACKEND).
    pub kind: BackendKind,
    /// Host and port of the S3 endpoint (RANGEWAY_S3_ENDPOINT).
    pub endpoint: String,
    /// Access key (RANGEWAY_S3_ACCESS_KEY).
    pub access_key: Option<String>,
    /// Secret key (RANGEWAY_S3_SECRET_KEY).
    pub secret_key: Option<String>,
    /// Connect with https (RANGEWAY_S3_USE_TLS).
    pub use_tls: bool,
    /// Signing region (RANGEWAY_S3_REGION).
    pub region: String,
    /// Bucket used by the object endpoints (RANGEWAY_S3_BUCKET).
    pub bucket: String,
    /// Presigned URL validity in seconds (RANGEWAY_PRESIGN_EXPIRY_SECS).
    pub presign_expiry_secs: u64,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("use_tls", &self.use_tls)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("presign_expiry_secs", &self.presign_expiry_secs)
            .finish_non_exhaustive()
    }
}

impl BackendConfig {
    /// Presigned URL validity.
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }
}

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics (RANGEWAY_METRICS_ENABLED).
    pub prometheus_enabled: bool,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self> {
        let config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Builds configuration from a variable lookup, applying defaults.
    ///
    /// Values that are present but malformed are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let max_upload_size = match var("RANGEWAY_MAX_UPLOAD_SIZE") {
            Some(s) => parse_size(&s)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid RANGEWAY_MAX_UPLOAD_SIZE")?,
            None => DEFAULT_MAX_UPLOAD_SIZE,
        };

        let kind = match var("RANGEWAY_BACKEND") {
            Some(s) => s
                .parse::<BackendKind>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid RANGEWAY_BACKEND")?,
            None => BackendKind::S3,
        };

        let presign_expiry_secs = match var("RANGEWAY_PRESIGN_EXPIRY_SECS") {
            Some(s) => s
                .parse::<u64>()
                .with_context(|| format!("Invalid RANGEWAY_PRESIGN_EXPIRY_SECS: {}", s))?
                .clamp(1, MAX_PRESIGN_EXPIRY_SECS),
            None => DEFAULT_PRESIGN_EXPIRY_SECS,
        };

        Ok(Self {
            server: ServerConfig {
                bind: var("RANGEWAY_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
                max_upload_size,
                tls: TlsConfig::from_paths(
                    var("RANGEWAY_TLS_CERT").map(PathBuf::from),
                    var("RANGEWAY_TLS_KEY").map(PathBuf::from),
                ),
            },
            backend: BackendConfig {
                kind,
                endpoint: var("RANGEWAY_S3_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_S3_ENDPOINT.to_string()),
                access_key: var("RANGEWAY_S3_ACCESS_KEY"),
                secret_key: var("RANGEWAY_S3_SECRET_KEY"),
                use_tls: parse_flag("RANGEWAY_S3_USE_TLS", var("RANGEWAY_S3_USE_TLS"), false)?,
                region: var("RANGEWAY_S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                bucket: var("RANGEWAY_S3_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
                presign_expiry_secs,
            },
            metrics: MetricsConfig {
                prometheus_enabled: parse_flag(
                    "RANGEWAY_METRICS_ENABLED",
                    var("RANGEWAY_METRICS_ENABLED"),
                    true,
                )?,
            },
        })
    }

    /// Checks settings that depend on each other.
    pub fn validate(&self) -> Result<()> {
        self.server
            .tls
            .validate()
            .map_err(|e| anyhow::anyhow!("TLS configuration error: {}", e))?;

        self.bind_addr()?;

        if self.backend.kind == BackendKind::S3 {
            if self.backend.access_key.is_none() {
                bail!("RANGEWAY_S3_ACCESS_KEY is required for the s3 backend");
            }
            if self.backend.secret_key.is_none() {
                bail!("RANGEWAY_S3_SECRET_KEY is required for the s3 backend");
            }
        }

        Ok(())
    }

    /// Parsed bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid RANGEWAY_BIND address: {}", self.server.bind))
    }
}

/// Parses a size string like "10GB", "100MB", "1024KB", "5000" into bytes.
///
/// Supported suffixes (case-insensitive):
/// - GB, G: Gigabytes
/// - MB, M: Megabytes
/// - KB, K: Kilobytes
/// - B or no suffix: Bytes
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty size string".to_string());
    }

    let num_end = s
        .chars()
        .position(|c| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());

    let (num_str, suffix) = s.split_at(num_end);
    let suffix = suffix.trim();

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    let multiplier: usize = match suffix {
        "GB" | "G" => 1024 * 1024 * 1024,
        "MB" | "M" => 1024 * 1024,
        "KB" | "K" => 1024,
        "B" | "" => 1,
        _ => return Err(format!("Unknown size suffix: {}", suffix)),
    };

    Ok((num * multiplier as f64) as usize)
}

/// Parses a boolean flag ("true"/"1"/"yes" or "false"/"0"/"no").
fn parse_flag(name: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => bail!("Invalid {}: expected true or false, got '{}'", name, v),
        },
    }
}
