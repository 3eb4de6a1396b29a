//! Report generation.
//!
//! Renders a snapshot of the state store as Markdown or JSON.

use crate::analysis::{channel_distribution, group_by_stream, RowSummary};
use crate::models::{AnalysisReport, ChartSlice, ReportMetadata, Row};
use crate::state::AnalysisStateStore;
use anyhow::Result;

/// Width of a 100% bar in the chart section.
const BAR_WIDTH: f64 = 40.0;

/// Snapshot the store into a report.
pub fn build_report(store: &AnalysisStateStore, metadata: ReportMetadata) -> AnalysisReport {
    let rows = store.rows().to_vec();

    AnalysisReport {
        metadata,
        summary: RowSummary::from_rows(&rows),
        chart: store.chart().to_vec(),
        rows,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    output.push_str("# Channel Analysis Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary, &report.rows));
    output.push_str(&generate_chart_section(&report.chart));
    output.push_str(&generate_rows_section(&report.rows));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source File:** `{}`\n", metadata.source_file));
    section.push_str(&format!("- **Server:** {}\n", metadata.server_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if metadata.toggles_applied > 0 {
        section.push_str(&format!(
            "- **Toggle Edits:** {}\n",
            metadata.toggles_applied
        ));
    }
    if metadata.toggles_reset {
        section.push_str("- **Toggles Reset:** yes\n");
    }
    section.push_str(&format!(
        "- **Re-analyzed:** {}\n",
        if metadata.reanalyzed { "yes" } else { "no" }
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &RowSummary, rows: &[Row]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Segments | Streams | Interpretable | Marked by User | Overridden |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        summary.total,
        group_by_stream(rows).len(),
        summary.interpretable,
        summary.interpretable_user,
        summary.overridden
    ));

    if !summary.by_channel_type.is_empty() || summary.unclassified > 0 {
        section.push_str("### Segments by Channel Type\n\n");
        section.push_str("| Channel Type | Segments | Share of Marked |\n");
        section.push_str("|:---|:---:|:---:|\n");

        for (channel_type, fraction) in channel_distribution(rows) {
            let count = summary
                .by_channel_type
                .get(&channel_type)
                .copied()
                .unwrap_or(0);
            section.push_str(&format!(
                "| {} | {} | {:.1}% |\n",
                channel_type,
                count,
                fraction * 100.0
            ));
        }
        if summary.unclassified > 0 {
            section.push_str(&format!("| Unclassified | {} | - |\n", summary.unclassified));
        }
        section.push('\n');
    }

    section
}

/// Generate the chart section.
fn generate_chart_section(chart: &[ChartSlice]) -> String {
    let mut section = String::new();

    section.push_str("## Channel Distribution\n\n");

    if chart.is_empty() {
        section.push_str("No distribution was returned by the service.\n\n");
        return section;
    }

    section.push_str("```\n");
    let label_width = chart.iter().map(|s| s.group.len()).max().unwrap_or(0);
    for slice in chart {
        section.push_str(&format!(
            "{:<width$}  {:<bar$}  {:.1}%\n",
            slice.group,
            bar(slice.value),
            slice.value,
            width = label_width,
            bar = BAR_WIDTH as usize
        ));
    }
    section.push_str("```\n\n");

    section
}

fn bar(percent: f64) -> String {
    let filled = (percent.clamp(0.0, 100.0) / 100.0 * BAR_WIDTH).round() as usize;
    "#".repeat(filled)
}

/// Generate the row table section.
fn generate_rows_section(rows: &[Row]) -> String {
    let mut section = String::new();

    section.push_str("## Segments\n\n");

    if rows.is_empty() {
        section.push_str("No segments were returned by the service.\n\n");
        return section;
    }

    section.push_str(
        "| ID | Stream | ksn | θ chi | θ SA | θ TT | err TT | θ TAK | err TAK | Interpretable | Confidence | User | Channel |\n",
    );
    section.push_str("|:---|---:|---:|---:|---:|---:|---:|---:|---:|:---:|---:|:---:|:---|\n");

    for row in rows {
        section.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} | {} | {} | {} | {} | {:.2} | {}{} | {} |\n",
            row.id,
            row.stream,
            row.ksn,
            row.theta_chi,
            row.theta_sa,
            row.rfit_theta_tt,
            row.error_tt,
            row.rfit_theta_tak,
            row.error_tak,
            yes_no(row.interpretable),
            row.interpret_confidence,
            yes_no(row.user_toggle()),
            if row.is_overridden() { " *" } else { "" },
            row.channel_type
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));
    }
    section.push_str("\n`*` user toggle differs from the service classification\n\n");

    section
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by geomorph*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::apply_response;
    use crate::models::AnalysisResponse;
    use chrono::Utc;

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            source_file: "streams.csv".to_string(),
            server_url: "http://127.0.0.1:3000".to_string(),
            generated_at: Utc::now(),
            toggles_applied: 2,
            toggles_reset: false,
            reanalyzed: true,
            duration_seconds: 1.5,
        }
    }

    fn create_test_report() -> AnalysisReport {
        let store = AnalysisStateStore::new();
        let response: AnalysisResponse =
            serde_json::from_str(include_str!("../../fixtures/analysis_response.json")).unwrap();
        apply_response(&store, Some(&response));
        build_report(&store, create_test_metadata())
    }

    #[test]
    fn test_build_report_snapshots_store() {
        let report = create_test_report();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.chart.len(), 3);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.overridden, 1);
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# Channel Analysis Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Channel Distribution"));
        assert!(markdown.contains("## Segments"));
        assert!(markdown.contains("`seg-a`"));
        assert!(markdown.contains("1.2346"));
        assert!(markdown.contains("45.7%"));
        assert!(markdown.contains("| Unclassified | 1 | - |"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let section = generate_metadata_section(&create_test_metadata());

        assert!(section.contains("`streams.csv`"));
        assert!(section.contains("Toggle Edits:** 2"));
        assert!(section.contains("Re-analyzed:** yes"));
        assert!(!section.contains("Toggles Reset"));
    }

    #[test]
    fn test_chart_section_bars() {
        let chart = vec![
            ChartSlice {
                group: "Fluvial".to_string(),
                value: 50.0,
            },
            ChartSlice {
                group: "Colluvial".to_string(),
                value: 0.0,
            },
        ];
        let section = generate_chart_section(&chart);

        assert!(section.contains(&format!("Fluvial    {}", "#".repeat(20))));
        assert!(section.contains("0.0%"));
        assert_eq!(bar(150.0).len(), 40);
    }

    #[test]
    fn test_empty_sections() {
        assert!(generate_chart_section(&[]).contains("No distribution"));
        assert!(generate_rows_section(&[]).contains("No segments"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"chart\""));
        assert!(json.contains("\"interpretable_user\""));
        assert!(json.contains("\"fluvial\""));
    }
}
