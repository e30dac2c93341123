//! Result types returned by the metric functions.

use serde::Serialize;
use std::fmt;

use crate::dataset::DateRange;

/// Label reported when a ranking has nothing to rank.
pub const NO_DATA_LABEL: &str = "no data";

/// Outcome of a best/worst group ranking.
#[derive(Debug, Clone, PartialEq)]
pub enum Ranked {
    Found { label: String, value: f64 },
    /// The dataset-wide guard failed; there is no meaningful winner.
    NoData,
}

impl Ranked {
    pub fn label(&self) -> &str {
        match self {
            Ranked::Found { label, .. } => label,
            Ranked::NoData => NO_DATA_LABEL,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Ranked::Found { value, .. } => *value,
            Ranked::NoData => 0.0,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Ranked::NoData)
    }
}

/// Checkout completion rate, or a marker that the metric does not apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckoutPerformance {
    Rate(f64),
    NotApplicable,
}

impl CheckoutPerformance {
    pub fn rate(self) -> Option<f64> {
        match self {
            CheckoutPerformance::Rate(r) => Some(r),
            CheckoutPerformance::NotApplicable => None,
        }
    }
}

/// Total spend and return on ad spend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Investment {
    pub total_cost: f64,
    pub roas: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increased,
    Decreased,
    Unchanged,
}

impl TrendDirection {
    /// Strict comparison; equal values are unchanged.
    pub fn between(previous: f64, current: f64) -> Self {
        if current > previous {
            TrendDirection::Increased
        } else if current < previous {
            TrendDirection::Decreased
        } else {
            TrendDirection::Unchanged
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Increased => "increased",
            TrendDirection::Decreased => "decreased",
            TrendDirection::Unchanged => "unchanged",
        })
    }
}

/// Conversion rate of the latest window against the one before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrailingTrend {
    pub window_days: u32,
    /// `None` when the dataset has no rows.
    pub current_window: Option<DateRange>,
    pub previous_window: Option<DateRange>,
    pub current_rate: f64,
    pub previous_rate: f64,
    pub trend: TrendDirection,
}
