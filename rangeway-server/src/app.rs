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

//! Application initialization and runtime.
//!
//! This module handles:
//! - Object backend initialization
//! - HTTP server setup and routing
//! - TLS/HTTPS configuration
//! - Graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::ServiceExt;
use rangeway_api::{create_router, AppState};
use rangeway_core::{MemoryBackend, ObjectBackend, S3Backend, S3Config};
use tokio::net::TcpListener;
use tower_http::normalize_path::NormalizePath;
use tracing::{info, warn};

use crate::config::{BackendKind, Config};

/// Main application.
pub struct App {
    config: Config,
    /// Object backend shared by all requests.
    backend: Arc<dyn ObjectBackend>,
}

impl App {
    /// Creates a new application instance.
    ///
    /// Validates the configuration and builds the object backend.
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing Rangeway application...");
        config.validate()?;

        let backend = build_backend(&config)?;

        Ok(Self { config, backend })
    }

    /// Builds the application state from the configuration.
    pub fn state(&self) -> AppState {
        AppState::new(self.backend.clone(), self.config.backend.bucket.clone())
            .with_max_upload_size(self.config.server.max_upload_size)
            .with_presign_expiry(self.config.backend.presign_expiry())
    }

    /// Runs the application (HTTP/HTTPS server).
    ///
    /// If TLS is configured via `RANGEWAY_TLS_CERT` and `RANGEWAY_TLS_KEY`,
    /// the server uses HTTPS. Otherwise, it runs as HTTP.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.bind_addr()?;

        info!("Rangeway Server starting...");
        info!(
            "Serving bucket '{}' from {:?} backend",
            self.config.backend.bucket, self.config.backend.kind
        );
        info!(
            "Max upload size: {} bytes ({:.2} GB)",
            self.config.server.max_upload_size,
            self.config.server.max_upload_size as f64 / (1024.0 * 1024.0 * 1024.0)
        );

        let tls_config = if self.config.server.tls.enabled {
            Some(self.load_tls_config().await?)
        } else {
            None
        };

        // Initialize Prometheus metrics recorder if enabled
        let prometheus_handle = if self.config.metrics.prometheus_enabled {
            use metrics_exporter_prometheus::PrometheusBuilder;
            match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    info!("Prometheus metrics enabled (available at /metrics)");
                    Some(handle)
                }
                Err(e) => {
                    warn!(
                        "Failed to install Prometheus recorder: {}. Metrics disabled.",
                        e
                    );
                    None
                }
            }
        } else {
            info!("Prometheus metrics disabled");
            None
        };

        let mut state = self.state();
        if let Some(handle) = prometheus_handle {
            state = state.with_prometheus_handle(handle);
        }

        let router = create_router(state);

        if let Some(rustls_config) = tls_config {
            info!("Listening on https://{}", addr);
            run_https_server(addr, router, rustls_config).await
        } else {
            info!("Listening on http://{}", addr);
            run_http_server(addr, router).await
        }
    }

    /// Loads TLS configuration from certificate and key files.
    async fn load_tls_config(&self) -> Result<axum_server::tls_rustls::RustlsConfig> {
        use axum_server::tls_rustls::RustlsConfig;

        let tls_config = &self.config.server.tls;

        let cert_path = tls_config
            .cert_path
            .as_ref()
            .context("TLS certificate path not configured")?;
        let key_path = tls_config
            .key_path
            .as_ref()
            .context("TLS private key path not configured")?;

        info!("Loading TLS certificate from {:?}", cert_path);
        info!("Loading TLS private key from {:?}", key_path);

        let rustls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .context("Failed to load TLS certificate and key")?;

        info!("TLS configured successfully");
        Ok(rustls_config)
    }
}

/// Creates the object backend selected by the configuration.
fn build_backend(config: &Config) -> Result<Arc<dyn ObjectBackend>> {
    let backend = &config.backend;
    match backend.kind {
        BackendKind::Memory => {
            warn!("Using in-memory backend; objects are lost on restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
        BackendKind::S3 => {
            let access_key = backend
                .access_key
                .clone()
                .context("RANGEWAY_S3_ACCESS_KEY is required for the s3 backend")?;
            let secret_key = backend
                .secret_key
                .clone()
                .context("RANGEWAY_S3_SECRET_KEY is required for the s3 backend")?;

            let mut s3_config =
                S3Config::new(backend.endpoint.clone(), access_key, secret_key, backend.use_tls);
            s3_config.region = backend.region.clone();

            let s3 = S3Backend::new(s3_config).context("Failed to create S3 backend")?;
            info!("S3 backend at {} (region {})", s3.base_url(), backend.region);
            Ok(Arc::new(s3))
        }
    }
}

/// Runs the HTTP server (without TLS).
async fn run_http_server(addr: SocketAddr, router: axum::Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Accept `/stream/` as well as `/stream`.
    let app = NormalizePath::trim_trailing_slash(router);

    axum::serve(
        listener,
        ServiceExt::<axum::http::Request<axum::body::Body>>::into_make_service(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Runs the HTTPS server (with TLS).
async fn run_https_server(
    addr: SocketAddr,
    router: axum::Router,
    rustls_config: axum_server::tls_rustls::RustlsConfig,
) -> Result<()> {
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(30)));
    });

    let app = NormalizePath::trim_trailing_slash(router);

    axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(ServiceExt::<axum::http::Request<axum::body::Body>>::into_make_service(app))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown...");
        }
    }
}
