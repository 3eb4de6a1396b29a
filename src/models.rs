//! Data models for analysis results.
//!
//! This module contains the wire structures exchanged with the analysis
//! service (rows, graph data, responses), the chart slices derived from
//! them, and the session report.

use crate::analysis::RowSummary;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Channel classification assigned by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Steep, hillslope-dominated channel heads
    Colluvial,
    /// Mixed process reach between colluvial and fluvial
    Transitional,
    /// Alluvial, river-dominated reach
    Fluvial,
}

impl ChannelType {
    /// All channel types, in the order the service reports them.
    pub const ALL: [ChannelType; 3] = [
        ChannelType::Fluvial,
        ChannelType::Transitional,
        ChannelType::Colluvial,
    ];
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Colluvial => write!(f, "Colluvial"),
            ChannelType::Transitional => write!(f, "Transitional"),
            ChannelType::Fluvial => write!(f, "Fluvial"),
        }
    }
}

/// One analysis result unit (a stream segment).
///
/// Fields the service adds beyond the known ones are kept in `extra` and
/// sent back unchanged on re-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Stable identifier, used as the join key for toggle updates.
    pub id: String,
    /// Stream number the segment belongs to.
    pub stream: i64,
    /// Normalized channel steepness index.
    pub ksn: f64,
    /// Concavity from chi analysis.
    pub theta_chi: f64,
    /// Concavity from slope-area regression.
    pub theta_sa: f64,
    pub rfit_theta_tt: f64,
    pub error_tt: f64,
    pub rfit_theta_tak: f64,
    pub error_tak: f64,
    /// Server-computed classification. Never edited locally.
    pub interpretable: bool,
    /// Confidence of the server classification.
    pub interpret_confidence: f64,
    /// User override of `interpretable`. An explicit `null` on the wire is
    /// treated the same as an absent field.
    #[serde(default)]
    pub interpretable_user: Option<bool>,
    #[serde(default)]
    pub channel_type: Option<ChannelType>,
    /// Unrecognized wire fields, in wire order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Row {
    /// The toggle value a view should display for this row.
    pub fn user_toggle(&self) -> bool {
        self.interpretable_user.unwrap_or(self.interpretable)
    }

    /// Whether the user toggle disagrees with the server classification.
    pub fn is_overridden(&self) -> bool {
        self.user_toggle() != self.interpretable
    }
}

/// Graph data attached to an analysis response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// Fraction of interpretable rows per channel-type key, in wire order.
    #[serde(default)]
    pub dist: Option<IndexMap<String, f64>>,
}

/// Response body of both analysis routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Rows before normalization. `None` when absent or not a sequence.
    #[serde(default, deserialize_with = "rows_if_sequence")]
    pub data: Option<Vec<Row>>,
    #[serde(default, alias = "graphData")]
    pub graph_data: Option<GraphData>,
}

impl AnalysisResponse {
    /// Consume the response and return its row list (empty when absent).
    pub fn into_rows(self) -> Vec<Row> {
        self.data.unwrap_or_default()
    }
}

/// Body sent to the re-analysis route.
#[derive(Debug, Serialize)]
pub struct ReanalyzeRequest<'a> {
    pub data: &'a [Row],
}

/// One slice of the channel-type distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSlice {
    /// Capitalized channel-type label.
    pub group: String,
    /// Percentage with one decimal digit.
    pub value: f64,
}

/// Metadata about an analysis session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// File that was uploaded.
    pub source_file: String,
    /// Proxy the session talked to.
    pub server_url: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of user toggle edits applied after the upload.
    pub toggles_applied: usize,
    /// Whether the toggles were reset to the service classification.
    pub toggles_reset: bool,
    /// Whether the table was re-submitted for a fresh distribution.
    pub reanalyzed: bool,
    /// Duration of the session in seconds.
    pub duration_seconds: f64,
}

/// Snapshot of the state store rendered as a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    /// Local statistics over the row table.
    pub summary: RowSummary,
    /// Chart series as held by the store.
    pub chart: Vec<ChartSlice>,
    /// Row table as held by the store.
    pub rows: Vec<Row>,
}

/// Accepts any JSON value for `data`; only arrays are parsed into rows.
///
/// A non-array value is treated like a missing one, while a malformed row
/// inside an array is still a hard error.
fn rows_if_sequence<'de, D>(deserializer: D) -> Result<Option<Vec<Row>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(de::Error::custom))
            .collect::<Result<Vec<Row>, D::Error>>()
            .map(Some),
        _ => Ok(None),
    }
}
