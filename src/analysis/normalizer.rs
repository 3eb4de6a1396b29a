//! Response normalization.
//!
//! Turns a raw analysis response into the rounded row table and the
//! percentage chart series the views display.

use crate::models::{AnalysisResponse, ChartSlice, Row};
use crate::state::AnalysisStateStore;
use indexmap::IndexMap;
use tracing::debug;

/// Decimal digits kept for every metric field.
pub const METRIC_PRECISION: u32 = 4;

/// Decimal digits kept for chart percentages.
pub const PERCENT_PRECISION: u32 = 1;

/// Result of a normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Replacement for the whole row table.
    pub rows: Vec<Row>,
    /// Replacement for the chart series, `None` when the response carried no
    /// distribution (the current chart is then kept).
    pub chart: Option<Vec<ChartSlice>>,
}

/// Normalize a response.
///
/// Returns `None` when there is nothing to ingest: no response, no `data`,
/// or an empty `data` list.
pub fn normalize(response: Option<&AnalysisResponse>) -> Option<Normalized> {
    let response = response?;
    let rows = response.data.as_deref().filter(|rows| !rows.is_empty())?;

    Some(Normalized {
        rows: rows.iter().map(normalize_row).collect(),
        chart: chart_from_response(response),
    })
}

/// Normalize a response and write the result into the store.
///
/// Returns the new row snapshot, or `None` when the response was a no-op and
/// the store was left untouched.
pub fn apply_response(
    store: &AnalysisStateStore,
    response: Option<&AnalysisResponse>,
) -> Option<Vec<Row>> {
    let Some(normalized) = normalize(response) else {
        debug!("Response carried no rows, state left unchanged");
        return None;
    };

    let rows = normalized.rows.clone();
    store.apply(normalized);
    Some(rows)
}

/// Chart series for a response, if it carries a distribution.
pub fn chart_from_response(response: &AnalysisResponse) -> Option<Vec<ChartSlice>> {
    response
        .graph_data
        .as_ref()?
        .dist
        .as_ref()
        .map(chart_from_dist)
}

/// One slice per distribution key, in key order.
pub fn chart_from_dist(dist: &IndexMap<String, f64>) -> Vec<ChartSlice> {
    dist.iter()
        .map(|(key, fraction)| ChartSlice {
            group: capitalize_first(key),
            value: round_to(fraction * 100.0, PERCENT_PRECISION),
        })
        .collect()
}

/// Round the metric fields and default the user toggle.
///
/// A `null` toggle on the wire counts as unset and is defaulted too.
pub fn normalize_row(row: &Row) -> Row {
    Row {
        ksn: round_to(row.ksn, METRIC_PRECISION),
        theta_chi: round_to(row.theta_chi, METRIC_PRECISION),
        theta_sa: round_to(row.theta_sa, METRIC_PRECISION),
        rfit_theta_tt: round_to(row.rfit_theta_tt, METRIC_PRECISION),
        error_tt: round_to(row.error_tt, METRIC_PRECISION),
        rfit_theta_tak: round_to(row.rfit_theta_tak, METRIC_PRECISION),
        error_tak: round_to(row.error_tak, METRIC_PRECISION),
        interpretable_user: Some(row.interpretable_user.unwrap_or(row.interpretable)),
        ..row.clone()
    }
}

/// Round to `digits` decimal places.
///
/// Scales by `10^digits` and uses [`f64::round`], so ties on the scaled value
/// go away from zero.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Upper-case the first character, leave the rest unchanged.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_row;
    use crate::models::GraphData;

    fn fixture() -> AnalysisResponse {
        serde_json::from_str(include_str!("../../fixtures/analysis_response.json")).unwrap()
    }

    fn metrics(row: &Row) -> [f64; 7] {
        [
            row.ksn,
            row.theta_chi,
            row.theta_sa,
            row.rfit_theta_tt,
            row.error_tt,
            row.rfit_theta_tak,
            row.error_tak,
        ]
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(12.3456789, 4), 12.3457);
        assert_eq!(round_to(45.67, 1), 45.7);
        assert_eq!(round_to(-1.23456, 4), -1.2346);
        assert_eq!(round_to(2.0, 4), 2.0);
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("bedrock"), "Bedrock");
        assert_eq!(capitalize_first("fluvial channel"), "Fluvial channel");
        assert_eq!(capitalize_first("mIXED"), "MIXED");
        assert_eq!(capitalize_first("élan"), "Élan");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_bedrock_scenario() {
        let mut row = sample_row("a");
        row.ksn = 1.23456;
        let response = AnalysisResponse {
            data: Some(vec![row]),
            graph_data: Some(GraphData {
                dist: Some([("bedrock".to_string(), 0.4567)].into_iter().collect()),
            }),
        };

        let normalized = normalize(Some(&response)).unwrap();
        assert_eq!(normalized.rows[0].ksn, 1.2346);
        assert_eq!(normalized.rows[0].interpretable_user, Some(true));
        assert_eq!(
            normalized.chart,
            Some(vec![ChartSlice {
                group: "Bedrock".to_string(),
                value: 45.7
            }])
        );
    }

    #[test]
    fn test_metrics_have_at_most_four_decimals() {
        let normalized = normalize(Some(&fixture())).unwrap();

        for row in &normalized.rows {
            for value in metrics(row) {
                assert_eq!(round_to(value, METRIC_PRECISION), value);
                let text = value.to_string();
                let decimals = text.split('.').nth(1).map_or(0, str::len);
                assert!(decimals <= 4, "{} has more than 4 decimals", text);
            }
        }
    }

    #[test]
    fn test_confidence_and_identity_pass_through() {
        let response = fixture();
        let normalized = normalize(Some(&response)).unwrap();
        let source = response.data.unwrap();

        for (out, original) in normalized.rows.iter().zip(&source) {
            assert_eq!(out.id, original.id);
            assert_eq!(out.stream, original.stream);
            assert_eq!(out.interpret_confidence, original.interpret_confidence);
            assert_eq!(out.channel_type, original.channel_type);
        }
    }

    #[test]
    fn test_user_toggle_defaults_only_when_undefined() {
        let normalized = normalize(Some(&fixture())).unwrap();

        // seg-a: undefined, server says interpretable
        assert_eq!(normalized.rows[0].interpretable_user, Some(true));
        // seg-b: predefined override is kept
        assert_eq!(normalized.rows[1].interpretable_user, Some(false));
        // seg-c: undefined, server says not interpretable
        assert_eq!(normalized.rows[2].interpretable_user, Some(false));
    }

    #[test]
    fn test_chart_keeps_key_order_and_rounding() {
        let normalized = normalize(Some(&fixture())).unwrap();
        let chart = normalized.chart.unwrap();

        let groups: Vec<&str> = chart.iter().map(|s| s.group.as_str()).collect();
        assert_eq!(groups, vec!["Fluvial", "Transitional", "Colluvial"]);
        let values: Vec<f64> = chart.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![45.7, 33.3, 21.0]);
    }

    #[test]
    fn test_missing_or_empty_data_is_a_no_op() {
        assert!(normalize(None).is_none());
        assert!(normalize(Some(&AnalysisResponse::default())).is_none());

        let empty = AnalysisResponse {
            data: Some(Vec::new()),
            graph_data: Some(GraphData {
                dist: Some([("fluvial".to_string(), 1.0)].into_iter().collect()),
            }),
        };
        assert!(normalize(Some(&empty)).is_none());
    }

    #[test]
    fn test_missing_dist_leaves_chart_unset() {
        let response = AnalysisResponse {
            data: Some(vec![sample_row("a")]),
            graph_data: Some(GraphData { dist: None }),
        };
        assert_eq!(normalize(Some(&response)).unwrap().chart, None);
    }

    #[test]
    fn test_apply_response_no_op_keeps_store() {
        let store = AnalysisStateStore::new();
        apply_response(&store, Some(&fixture())).unwrap();
        let before = store.rows();
        let chart_before = store.chart();

        assert!(apply_response(&store, Some(&AnalysisResponse::default())).is_none());
        assert_eq!(store.rows(), before);
        assert_eq!(store.chart(), chart_before);
    }

    #[test]
    fn test_apply_response_without_dist_keeps_chart() {
        let store = AnalysisStateStore::new();
        apply_response(&store, Some(&fixture())).unwrap();

        let response = AnalysisResponse {
            data: Some(vec![sample_row("z")]),
            graph_data: None,
        };
        let rows = apply_response(&store, Some(&response)).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(store.rows()[0].id, "z");
        assert_eq!(store.chart().len(), 3);
    }
}
