//! Client for the analysis proxy.
//!
//! Issues the upload and re-analysis calls, hands the responses to the
//! normalizer and writes the results into the shared state store.

use crate::analysis::{apply_response, chart_from_response};
use crate::config::ClientConfig;
use crate::error::{status_text, ClientError};
use crate::models::{AnalysisResponse, ReanalyzeRequest, Row};
use crate::state::AnalysisStateStore;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Route of the upload proxy endpoint.
pub const ANALYZE_ROUTE: &str = "/api/analyze";

/// Route of the re-analysis proxy endpoint.
pub const REANALYZE_ROUTE: &str = "/api/reanalyze";

/// A file to submit for analysis.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name sent with the multipart part. The service picks the parser
    /// from its extension.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(file_name, bytes))
    }
}

/// Error body returned by the proxy.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the two analysis routes.
pub struct AnalysisClient {
    config: ClientConfig,
    http_client: reqwest::Client,
    store: Arc<AnalysisStateStore>,
}

impl AnalysisClient {
    /// Create a client writing into `store`.
    pub fn new(config: ClientConfig, store: Arc<AnalysisStateStore>) -> Result<Self, ClientError> {
        info!("Initializing analysis client for {}", config.server_url);

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let http_client = builder.build()?;

        Ok(Self {
            config,
            http_client,
            store,
        })
    }

    /// The store this client writes into.
    pub fn store(&self) -> &Arc<AnalysisStateStore> {
        &self.store
    }

    /// Upload a file for analysis.
    ///
    /// On success the response is normalized into the store and the new rows
    /// are returned. If the response carried no rows the store is left as is
    /// and the (empty) response row list is returned.
    pub async fn upload(&self, file: UploadFile) -> Result<Vec<Row>, ClientError> {
        self.upload_inner(file).await.inspect_err(|e| {
            error!("Error uploading and analyzing file: {}", e);
        })
    }

    async fn upload_inner(&self, file: UploadFile) -> Result<Vec<Row>, ClientError> {
        info!(
            "Uploading {} ({} bytes) for analysis",
            file.file_name,
            file.bytes.len()
        );

        let part = Part::bytes(file.bytes).file_name(file.file_name);
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(self.url(ANALYZE_ROUTE))
            .multipart(form)
            .send()
            .await?;

        let analysis = read_analysis_response(response).await?;

        match apply_response(&self.store, Some(&analysis)) {
            Some(rows) => {
                info!("Analysis returned {} rows", rows.len());
                Ok(rows)
            }
            None => Ok(analysis.into_rows()),
        }
    }

    /// Re-submit the current row table.
    ///
    /// An empty table returns an empty list without touching the network.
    /// Only the chart is updated from the response; the returned rows are
    /// the response's own, unnormalized, and are not stored.
    pub async fn reanalyze(&self) -> Result<Vec<Row>, ClientError> {
        let rows = self.store.rows();
        if rows.is_empty() {
            debug!("No rows to re-analyze");
            return Ok(Vec::new());
        }

        self.reanalyze_inner(&rows).await.inspect_err(|e| {
            error!("Error reanalyzing data: {}", e);
        })
    }

    async fn reanalyze_inner(&self, rows: &[Row]) -> Result<Vec<Row>, ClientError> {
        info!("Re-analyzing {} rows", rows.len());

        let response = self
            .http_client
            .post(self.url(REANALYZE_ROUTE))
            .json(&ReanalyzeRequest { data: rows })
            .send()
            .await?;

        let analysis = read_analysis_response(response).await?;

        if let Some(chart) = chart_from_response(&analysis) {
            self.store.set_chart(chart);
        }

        Ok(analysis.into_rows())
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.config.server_url.trim_end_matches('/'), route)
    }
}

/// Check the status and decode the body of a proxy response.
async fn read_analysis_response(
    response: reqwest::Response,
) -> Result<AnalysisResponse, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        return Err(ClientError::RemoteService {
            status: status.as_u16(),
            status_text: status_text(status),
            message,
        });
    }

    Ok(serde_json::from_slice(&body)?)
}
