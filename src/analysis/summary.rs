//! Row aggregation and statistics.
//!
//! Summaries computed locally from the row table, used by the report view.

use crate::models::{ChannelType, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of the current row table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSummary {
    /// Total number of rows.
    pub total: usize,
    /// Rows the service classified as interpretable.
    pub interpretable: usize,
    /// Rows the user currently marks as interpretable.
    pub interpretable_user: usize,
    /// Rows whose user toggle disagrees with the service.
    pub overridden: usize,
    /// Rows without a channel type.
    pub unclassified: usize,
    /// Row counts per channel type.
    pub by_channel_type: BTreeMap<ChannelType, usize>,
}

impl RowSummary {
    /// Creates a summary from a list of rows.
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };

        for row in rows {
            if row.interpretable {
                summary.interpretable += 1;
            }
            if row.user_toggle() {
                summary.interpretable_user += 1;
            }
            if row.is_overridden() {
                summary.overridden += 1;
            }

            match row.channel_type {
                Some(channel_type) => {
                    *summary.by_channel_type.entry(channel_type).or_insert(0) += 1
                }
                None => summary.unclassified += 1,
            }
        }

        summary
    }
}

/// Group rows by stream number.
pub fn group_by_stream(rows: &[Row]) -> BTreeMap<i64, Vec<&Row>> {
    let mut grouped: BTreeMap<i64, Vec<&Row>> = BTreeMap::new();

    for row in rows {
        grouped.entry(row.stream).or_default().push(row);
    }

    grouped
}

/// Channel-type distribution over the rows the user marks as interpretable.
///
/// Every channel type is present; fractions are 0.0 when no row is
/// interpretable. Rows without a channel type count toward the total only.
pub fn channel_distribution(rows: &[Row]) -> Vec<(ChannelType, f64)> {
    let interpretable: Vec<&Row> = rows.iter().filter(|r| r.user_toggle()).collect();
    let total = interpretable.len();

    ChannelType::ALL
        .iter()
        .map(|&channel_type| {
            let count = interpretable
                .iter()
                .filter(|r| r.channel_type == Some(channel_type))
                .count();
            let fraction = if total > 0 {
                count as f64 / total as f64
            } else {
                0.0
            };
            (channel_type, fraction)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_row;

    fn create_test_rows() -> Vec<Row> {
        let mut a = sample_row("a");
        a.channel_type = Some(ChannelType::Fluvial);

        let mut b = sample_row("b");
        b.stream = 2;
        b.channel_type = Some(ChannelType::Colluvial);
        b.interpretable_user = Some(false);

        let mut c = sample_row("c");
        c.stream = 2;
        c.interpretable = false;
        c.channel_type = None;

        let mut d = sample_row("d");
        d.interpretable = false;
        d.interpretable_user = Some(true);
        d.channel_type = Some(ChannelType::Transitional);

        vec![a, b, c, d]
    }

    #[test]
    fn test_row_summary() {
        let summary = RowSummary::from_rows(&create_test_rows());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.interpretable, 2);
        assert_eq!(summary.interpretable_user, 2);
        assert_eq!(summary.overridden, 2);
        assert_eq!(summary.unclassified, 1);
        assert_eq!(summary.by_channel_type.get(&ChannelType::Fluvial), Some(&1));
        assert_eq!(summary.by_channel_type.get(&ChannelType::Colluvial), Some(&1));
    }

    #[test]
    fn test_group_by_stream() {
        let rows = create_test_rows();
        let grouped = group_by_stream(&rows);

        assert_eq!(grouped.get(&1).map(|v| v.len()), Some(2));
        assert_eq!(grouped.get(&2).map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_channel_distribution() {
        let dist = channel_distribution(&create_test_rows());

        // interpretable by user: a (fluvial), d (transitional)
        assert_eq!(
            dist,
            vec![
                (ChannelType::Fluvial, 0.5),
                (ChannelType::Transitional, 0.5),
                (ChannelType::Colluvial, 0.0),
            ]
        );
    }

    #[test]
    fn test_channel_distribution_empty() {
        let dist = channel_distribution(&[]);
        assert_eq!(dist.len(), 3);
        assert!(dist.iter().all(|(_, fraction)| *fraction == 0.0));
    }
}
