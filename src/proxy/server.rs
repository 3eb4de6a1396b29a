//! Proxy endpoints in front of the analysis service.
//!
//! `POST /api/analyze` forwards an uploaded file to `{upstream}/analyze/file`,
//! `POST /api/reanalyze` forwards a row table to `{upstream}/analyze/json`.
//! Both relay the upstream JSON byte for byte, or answer with `{error}`.

use crate::client::{ANALYZE_ROUTE, REANALYZE_ROUTE};
use crate::config::{ServerConfig, UpstreamConfig};
use crate::error::{status_text, ProxyError};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use reqwest::multipart::{Form, Part};
use serde::de::IgnoredAny;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Upstream path for file analysis.
pub const UPSTREAM_FILE_PATH: &str = "/analyze/file";

/// Upstream path for row-table re-analysis.
pub const UPSTREAM_JSON_PATH: &str = "/analyze/json";

const NO_FILE_UPLOADED: &str = "No file uploaded";
const NO_DATA_PROVIDED: &str = "No data provided";

/// Shared state of the proxy handlers.
pub struct ProxyState {
    api_url: String,
    http_client: reqwest::Client,
}

impl ProxyState {
    /// Build the upstream HTTP client.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let http_client = builder
            .build()
            .context("Failed to create upstream HTTP client")?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn upstream(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

/// A file pulled out of the multipart body.
struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

/// Build the proxy router.
pub fn router(state: ProxyState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(ANALYZE_ROUTE, post(analyze))
        .route(REANALYZE_ROUTE, post(reanalyze))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(Arc::new(state))
}

/// Run the proxy until Ctrl-C.
pub async fn serve(server: &ServerConfig, upstream: &UpstreamConfig) -> Result<()> {
    let state = ProxyState::new(upstream)?;
    let app = router(state, server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", server.bind))?;

    info!(
        "Proxy listening on {} (upstream: {})",
        listener.local_addr().context("Failed to read local address")?,
        upstream.api_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Proxy server failed")?;

    info!("Proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

async fn analyze(
    State(state): State<Arc<ProxyState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ProxyError> {
    let multipart = multipart.map_err(|rejection| {
        warn!("Upload is not a multipart body: {}", rejection);
        ProxyError::Validation(NO_FILE_UPLOADED.to_string())
    })?;

    let Some(file) = find_file_field(multipart).await? else {
        warn!("Upload has no file field");
        return Err(ProxyError::Validation(NO_FILE_UPLOADED.to_string()));
    };

    forward_file(&state, file).await.inspect_err(|e| {
        error!("Error processing file on server: {}", e);
    })
}

async fn find_file_field(mut multipart: Multipart) -> Result<Option<UploadedFile>, ProxyError> {
    while let Some(field) = multipart.next_field().await.map_err(malformed_multipart)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(malformed_multipart)?;
        return Ok(Some(UploadedFile { file_name, bytes }));
    }

    Ok(None)
}

fn malformed_multipart(err: axum::extract::multipart::MultipartError) -> ProxyError {
    warn!("Malformed multipart body: {}", err);
    ProxyError::Validation(format!("Malformed multipart body: {}", err.body_text()))
}

async fn forward_file(state: &ProxyState, file: UploadedFile) -> Result<Response, ProxyError> {
    debug!(
        "Forwarding {} ({} bytes) to {}",
        file.file_name,
        file.bytes.len(),
        UPSTREAM_FILE_PATH
    );

    let part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
    let form = Form::new().part("file", part);

    let response = state
        .http_client
        .post(state.upstream(UPSTREAM_FILE_PATH))
        .multipart(form)
        .send()
        .await?;

    relay(response).await
}

async fn reanalyze(
    State(state): State<Arc<ProxyState>>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!("Re-analysis body is not JSON: {}", e);
        ProxyError::Validation(format!("Invalid JSON body: {}", e))
    })?;

    let data = match payload.get("data") {
        Some(Value::Array(rows)) if !rows.is_empty() => rows,
        _ => {
            warn!("Re-analysis body has no rows");
            return Err(ProxyError::Validation(NO_DATA_PROVIDED.to_string()));
        }
    };

    forward_rows(&state, data).await.inspect_err(|e| {
        error!("Error reanalyzing data on server: {}", e);
    })
}

async fn forward_rows(state: &ProxyState, rows: &[Value]) -> Result<Response, ProxyError> {
    debug!("Forwarding {} rows to {}", rows.len(), UPSTREAM_JSON_PATH);

    let response = state
        .http_client
        .post(state.upstream(UPSTREAM_JSON_PATH))
        .json(&json!({ "data": rows }))
        .send()
        .await?;

    relay(response).await
}

/// Relay a successful upstream JSON body, or turn its status into an error.
///
/// The body is checked to be JSON and passed on unchanged, so key order
/// (notably of `graph_data.dist`) survives the hop.
async fn relay(response: reqwest::Response) -> Result<Response, ProxyError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProxyError::RemoteService {
            status: status.as_u16(),
            status_text: status_text(status),
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice::<IgnoredAny>(&body)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
