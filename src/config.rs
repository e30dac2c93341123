//! Report configuration.
//!
//! Replaces interactive selections with an explicit value handed to the
//! report driver. Values come from, in increasing precedence: defaults, a
//! JSON file, command-line flags.
//!
//! ```json
//! {
//!   "platform": "Google Ads",
//!   "start_date": "2024-01-01",
//!   "end_date": "2024-01-31",
//!   "selected_metrics": ["revenue", "impressions"],
//!   "trend_window_days": 7
//! }
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dataset::DateRange;
use crate::metrics::DEFAULT_TREND_WINDOW_DAYS;
use crate::platform::{Measure, Platform};

pub const DEFAULT_WORKBOOK: &str = "acompanhamento.xlsx";
pub const WORKBOOK_ENV: &str = "ADS_REPORT_WORKBOOK";
pub const CONFIG_ENV: &str = "ADS_REPORT_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Which platform table to report on.
    pub platform: Platform,
    /// Range start; defaults to the earliest date in the table.
    pub start_date: Option<NaiveDate>,
    /// Range end; defaults to the latest date in the table.
    pub end_date: Option<NaiveDate>,
    /// Measures that get an ad-hoc metric chart.
    pub selected_metrics: Vec<Measure>,
    pub trend_window_days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            platform: Platform::MetaAds,
            start_date: None,
            end_date: None,
            selected_metrics: vec![Measure::Revenue],
            trend_window_days: DEFAULT_TREND_WINDOW_DAYS,
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config: ReportConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        Ok(config)
    }

    /// Config from `ADS_REPORT_CONFIG` if set, otherwise defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// The range to report on, filling unset ends from `bounds`.
    pub fn resolve_range(&self, bounds: DateRange) -> DateRange {
        DateRange::new(
            self.start_date.unwrap_or(bounds.start),
            self.end_date.unwrap_or(bounds.end),
        )
    }
}

/// Workbook path from `ADS_REPORT_WORKBOOK`, or the default file name.
pub fn workbook_path_from_env() -> PathBuf {
    std::env::var_os(WORKBOOK_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKBOOK))
}
