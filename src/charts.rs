//! Data behind the report charts.
//!
//! Only series are computed here; drawing them is up to the presenter.

use chrono::Datelike;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::metrics::utility::{group_sums, mean};
use crate::platform::Measure;

/// One labelled value of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Ad-hoc chart of a single measure: per-day sums plus row-level max and mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricChart {
    pub measure: Measure,
    /// Largest single-row value, `None` when every cell is empty.
    pub max: Option<f64>,
    /// Mean of the non-empty cells.
    pub mean: Option<f64>,
    pub series: Vec<SeriesPoint>,
}

/// All chart series of one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub revenue_by_day: Vec<SeriesPoint>,
    pub purchases_by_weekday: Vec<SeriesPoint>,
    pub metrics: Vec<MetricChart>,
}

impl ChartSet {
    pub fn build(data: &Dataset, selected: &[Measure]) -> Self {
        Self {
            revenue_by_day: revenue_by_day(data),
            purchases_by_weekday: purchases_by_weekday(data),
            metrics: selected
                .iter()
                .filter_map(|m| metric_chart(data, *m))
                .collect(),
        }
    }
}

/// Revenue per `dd/mm` label, in calendar order.
pub fn revenue_by_day(data: &Dataset) -> Vec<SeriesPoint> {
    daily_series(data, Measure::Revenue)
}

/// Purchases per weekday, Monday first.
pub fn purchases_by_weekday(data: &Dataset) -> Vec<SeriesPoint> {
    let sums = group_sums(
        data,
        |r| (r.date.weekday().num_days_from_monday(), r.weekday.clone()),
        Measure::Purchases,
    );
    sums.into_iter()
        .map(|((_, label), value)| SeriesPoint { label, value })
        .collect()
}

/// Chart data for `measure`, or `None` if the sheet has no such column.
pub fn metric_chart(data: &Dataset, measure: Measure) -> Option<MetricChart> {
    if !data.has_column(measure) {
        return None;
    }

    let present: Vec<f64> = data
        .records
        .iter()
        .filter_map(|r| r.measures.get(measure))
        .collect();

    let max = present.iter().copied().reduce(f64::max);
    let average = (!present.is_empty()).then(|| mean(&present));

    Some(MetricChart {
        measure,
        max,
        mean: average,
        series: daily_series(data, measure),
    })
}

// Keyed by (month, day) so labels sort chronologically within a year.
fn daily_series(data: &Dataset, measure: Measure) -> Vec<SeriesPoint> {
    let sums = group_sums(
        data,
        |r| (r.date.month(), r.date.day(), r.day_label.clone()),
        measure,
    );
    sums.into_iter()
        .map(|((_, _, label), value)| SeriesPoint { label, value })
        .collect()
}
