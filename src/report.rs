//! Report driver.
//!
//! load -> select platform -> preprocess -> default bounds -> range filter
//! -> metrics and charts. An empty range is not an error: the outcome says
//! so and no metric is computed.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::charts::ChartSet;
use crate::config::ReportConfig;
use crate::dataset::{DateRange, Dataset};
use crate::error::LoadError;
use crate::loader::{Sources, load_workbook};
use crate::metrics::{self, CheckoutPerformance, TrailingTrend};
use crate::platform::{Measure, Platform};
use crate::preprocess::preprocess;

/// A single entry of the results mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Label(String),
    NotApplicable,
}

/// Every KPI of one report, keyed the way the presenter expects them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResults {
    pub conversion_rate: f64,
    pub highest_revenue_day: String,
    pub highest_revenue: f64,
    pub highest_ticket_day: String,
    pub highest_ticket: f64,
    pub checkout_ratio: CheckoutPerformance,
    pub total_investment: f64,
    pub total_revenue: f64,
    pub roas: f64,
    pub lowest_cac_day: String,
    pub lowest_cac: f64,
}

impl ReportResults {
    pub fn compute(data: &Dataset, platform: Platform) -> Self {
        let revenue_day = metrics::highest_revenue_day(data);
        let ticket_day = metrics::highest_ticket_day(data);
        let investment = metrics::investment_and_return(data);
        let cac_day = metrics::lowest_cac_weekday(data);

        Self {
            conversion_rate: metrics::conversion_rate(data, platform),
            highest_revenue_day: revenue_day.label().to_string(),
            highest_revenue: revenue_day.value(),
            highest_ticket_day: ticket_day.label().to_string(),
            highest_ticket: ticket_day.value(),
            checkout_ratio: metrics::checkout_performance(data, platform),
            total_investment: investment.total_cost,
            total_revenue: metrics::total_revenue(data),
            roas: investment.roas,
            lowest_cac_day: cac_day.label().to_string(),
            lowest_cac: cac_day.value(),
        }
    }

    /// Metric name to value.
    pub fn to_map(&self) -> BTreeMap<&'static str, MetricValue> {
        let checkout = match self.checkout_ratio {
            CheckoutPerformance::Rate(r) => MetricValue::Number(r),
            CheckoutPerformance::NotApplicable => MetricValue::NotApplicable,
        };

        BTreeMap::from([
            ("conversion_rate", MetricValue::Number(self.conversion_rate)),
            (
                "highest_revenue_day",
                MetricValue::Label(self.highest_revenue_day.clone()),
            ),
            ("highest_revenue", MetricValue::Number(self.highest_revenue)),
            (
                "highest_ticket_day",
                MetricValue::Label(self.highest_ticket_day.clone()),
            ),
            ("highest_ticket", MetricValue::Number(self.highest_ticket)),
            ("checkout_ratio", checkout),
            ("total_investment", MetricValue::Number(self.total_investment)),
            ("total_revenue", MetricValue::Number(self.total_revenue)),
            ("roas", MetricValue::Number(self.roas)),
            ("lowest_cac_day", MetricValue::Label(self.lowest_cac_day.clone())),
            ("lowest_cac", MetricValue::Number(self.lowest_cac)),
        ])
    }
}

/// A computed report for one platform and date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub platform: Platform,
    pub range: DateRange,
    pub last_available_date: NaiveDate,
    pub results: ReportResults,
    pub trend: TrailingTrend,
    pub charts: ChartSet,
    /// Rows inside `range`, for charting.
    #[serde(skip)]
    pub filtered: Dataset,
    /// The whole preprocessed platform table.
    #[serde(skip)]
    pub platform_data: Dataset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Ready(Box<Report>),
    /// The selected range holds no rows; metrics were skipped.
    NoData {
        platform: Platform,
        /// `None` when the table has no valid dates at all.
        range: Option<DateRange>,
    },
}

/// Loads the workbook at `path` and runs the report on it.
pub fn run_report_from_path(path: &Path, config: &ReportConfig) -> Result<ReportOutcome, LoadError> {
    let sources = load_workbook(path)?;
    Ok(run_report(&sources, config))
}

/// Runs the report over already loaded tables.
#[tracing::instrument(skip_all, fields(platform = %config.platform))]
pub fn run_report(sources: &Sources, config: &ReportConfig) -> ReportOutcome {
    let platform = config.platform;
    let platform_data = preprocess(sources.get(platform));

    let Some(bounds) = platform_data.date_bounds() else {
        warn!("Platform table has no rows with a valid date");
        return ReportOutcome::NoData {
            platform,
            range: None,
        };
    };

    let range = config.resolve_range(bounds);
    let filtered = platform_data.filter(&range);

    if filtered.is_empty() {
        warn!(start = %range.start, end = %range.end, "No data for the selected range");
        return ReportOutcome::NoData {
            platform,
            range: Some(range),
        };
    }

    let results = ReportResults::compute(&filtered, platform);
    let trend =
        metrics::conversion_rate_trailing_window(&platform_data, platform, config.trend_window_days);
    let charts = ChartSet::build(&filtered, &config.selected_metrics);

    info!(
        start = %range.start,
        end = %range.end,
        rows = filtered.len(),
        total_revenue = results.total_revenue,
        "Report computed"
    );

    ReportOutcome::Ready(Box::new(Report {
        platform,
        range,
        last_available_date: bounds.end,
        results,
        trend,
        charts,
        filtered,
        platform_data,
    }))
}

/// Row counts and date coverage of one platform table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub platform: Platform,
    pub rows: usize,
    pub dated_rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub columns: Vec<Measure>,
}

pub fn summarize_sources(sources: &Sources) -> Vec<SourceSummary> {
    Platform::ALL
        .into_iter()
        .map(|platform| {
            let raw = sources.get(platform);
            let data = preprocess(raw);
            SourceSummary {
                platform,
                rows: raw.records.len(),
                dated_rows: data.len(),
                first_date: data.min_date(),
                last_date: data.max_date(),
                columns: raw.columns.clone(),
            }
        })
        .collect()
}
