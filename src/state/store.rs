//! Analysis state store.
//!
//! The store is an explicit context object shared as
//! `Arc<AnalysisStateStore>`. It owns two observable containers: the row
//! table and the chart series. Rows are replaced wholesale by a
//! normalization pass; afterwards only `interpretable_user` is edited, via
//! [`AnalysisStateStore::update_toggle`] and
//! [`AnalysisStateStore::reset_toggles`].

use super::observable::{Observable, SubscriptionId};
use crate::analysis::Normalized;
use crate::models::{ChartSlice, Row};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Observable row table and chart series.
#[derive(Default)]
pub struct AnalysisStateStore {
    rows: Observable<Vec<Row>>,
    chart: Observable<Vec<ChartSlice>>,
}

impl AnalysisStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current row snapshot.
    pub fn rows(&self) -> Arc<Vec<Row>> {
        self.rows.get()
    }

    /// Current chart snapshot.
    pub fn chart(&self) -> Arc<Vec<ChartSlice>> {
        self.chart.get()
    }

    /// Subscribe to row table changes. The current rows are delivered at once.
    pub fn subscribe_rows<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<Vec<Row>>) + Send + Sync + 'static,
    {
        self.rows.subscribe(callback)
    }

    /// Subscribe to chart changes. The current chart is delivered at once.
    pub fn subscribe_chart<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<Vec<ChartSlice>>) + Send + Sync + 'static,
    {
        self.chart.subscribe(callback)
    }

    pub fn unsubscribe_rows(&self, id: SubscriptionId) -> bool {
        self.rows.unsubscribe(id)
    }

    pub fn unsubscribe_chart(&self, id: SubscriptionId) -> bool {
        self.chart.unsubscribe(id)
    }

    /// Replace the whole row table.
    pub fn set_rows(&self, rows: Vec<Row>) {
        debug!("Replacing row table with {} rows", rows.len());
        self.rows.set(rows);
    }

    /// Replace the whole chart series.
    pub fn set_chart(&self, slices: Vec<ChartSlice>) {
        debug!("Replacing chart with {} slices", slices.len());
        self.chart.set(slices);
    }

    /// Write a normalization result: the chart first (when present), then
    /// the rows.
    pub fn apply(&self, normalized: Normalized) {
        if let Some(chart) = normalized.chart {
            self.set_chart(chart);
        }
        self.set_rows(normalized.rows);
    }

    /// Set every row's user toggle back to the server classification.
    ///
    /// Always sends exactly one notification, even when nothing changed.
    pub fn reset_toggles(&self) {
        self.rows.update(|rows| {
            Some(
                rows.iter()
                    .map(|row| Row {
                        interpretable_user: Some(row.interpretable),
                        ..row.clone()
                    })
                    .collect(),
            )
        });
    }

    /// Set the user toggle of the row with the given id.
    ///
    /// Only the first row with a matching id is updated; duplicate ids
    /// further down the table keep their value. Returns `false` and sends no
    /// notification when no row matches.
    pub fn update_toggle(&self, id: &str, value: bool) -> bool {
        let updated = self.rows.update(|rows| {
            let index = rows.iter().position(|row| row.id == id)?;
            let mut next = rows.clone();
            next[index].interpretable_user = Some(value);
            Some(next)
        });

        if !updated {
            debug!("No row with id {}, toggle ignored", id);
        }
        updated
    }
}

impl fmt::Debug for AnalysisStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisStateStore")
            .field("rows", &self.rows().len())
            .field("chart", &self.chart().len())
            .field("row_subscribers", &self.rows.subscriber_count())
            .field("chart_subscribers", &self.chart.subscriber_count())
            .finish()
    }
}
