//! Output formatting and persistence for reports.
//!
//! Supports a plain-text summary with pt-BR number formatting, JSON export
//! and appending a summary row to a CSV history file.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;

use crate::charts::SeriesPoint;
use crate::dataset::DateRange;
use crate::metrics::{CheckoutPerformance, TrendDirection};
use crate::platform::{Measure, Platform};
use crate::report::Report;

/// Logs the report using Rust's debug pretty-print format.
pub fn print_pretty(report: &Report) {
    debug!("{:#?}", report);
}

/// Writes the report as pretty-printed JSON to `path`, replacing the file.
pub fn write_json(path: &Path, report: &Report) -> Result<()> {
    let body = serde_json::to_vec_pretty(report)?;
    std::fs::write(path, body).with_context(|| format!("failed to write '{}'", path.display()))?;
    debug!(path = %path.display(), "JSON report written");
    Ok(())
}

/// One line of the CSV report history.
#[derive(Debug, Serialize)]
pub struct HistoryRow {
    pub generated_at: DateTime<Utc>,
    pub platform: Platform,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub conversion_rate: f64,
    pub highest_revenue_day: String,
    pub highest_revenue: f64,
    pub highest_ticket_day: String,
    pub highest_ticket: f64,
    pub checkout_ratio: Option<f64>,
    pub total_investment: f64,
    pub total_revenue: f64,
    pub roas: f64,
    pub lowest_cac_day: String,
    pub lowest_cac: f64,
    pub trend: TrendDirection,
}

impl HistoryRow {
    pub fn from_report(report: &Report) -> Self {
        let r = &report.results;
        HistoryRow {
            generated_at: Utc::now(),
            platform: report.platform,
            start_date: report.range.start,
            end_date: report.range.end,
            conversion_rate: r.conversion_rate,
            highest_revenue_day: r.highest_revenue_day.clone(),
            highest_revenue: r.highest_revenue,
            highest_ticket_day: r.highest_ticket_day.clone(),
            highest_ticket: r.highest_ticket,
            checkout_ratio: r.checkout_ratio.rate(),
            total_investment: r.total_investment,
            total_revenue: r.total_revenue,
            roas: r.roas,
            lowest_cac_day: r.lowest_cac_day.clone(),
            lowest_cac: r.lowest_cac,
            trend: report.trend.trend,
        }
    }
}

/// Appends a [`HistoryRow`] for `report` to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, report: &Report) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(HistoryRow::from_report(report))?;
    writer.flush()?;

    Ok(())
}

/// Human-readable summary of a report.
pub fn render_text(report: &Report) -> String {
    let r = &report.results;
    let checkout = match r.checkout_ratio {
        CheckoutPerformance::Rate(rate) => format_percent(rate),
        CheckoutPerformance::NotApplicable => "n/a".to_string(),
    };

    let mut out = format!(
        "=== {} | {} ===\n\
         Last available date: {}\n\
         \n\
         Conversion rate:        {}\n\
         Highest revenue:        {} ({})\n\
         Total revenue:          {}\n\
         ROAS:                   {}\n\
         Highest average ticket: {} ({})\n\
         Total investment:       {}\n\
         Lowest CAC:             {} ({})\n\
         Checkout rate:          {}\n\
         \n",
        report.platform,
        format_range(&report.range),
        format_date(report.last_available_date),
        format_percent(r.conversion_rate),
        r.highest_revenue_day,
        format_brl(r.highest_revenue),
        format_brl(r.total_revenue),
        format_decimal(r.roas, 2),
        r.highest_ticket_day,
        format_brl(r.highest_ticket),
        format_brl(r.total_investment),
        r.lowest_cac_day,
        format_brl(r.lowest_cac),
        checkout,
    );
    out.push_str(&render_trend(report));

    out.push_str("\nRevenue by day:\n");
    out.push_str(&render_series(&report.charts.revenue_by_day, format_brl));

    out.push_str("\nPurchases by weekday:\n");
    out.push_str(&render_series(&report.charts.purchases_by_weekday, |v| {
        format_decimal(v, 0)
    }));

    for chart in &report.charts.metrics {
        let fmt = value_formatter(chart.measure);
        out.push_str(&format!(
            "\n{} over time (max {}, mean {}):\n",
            chart.measure,
            chart.max.map(fmt).unwrap_or_else(|| "-".into()),
            chart.mean.map(fmt).unwrap_or_else(|| "-".into()),
        ));
        out.push_str(&render_series(&chart.series, fmt));
    }

    out
}

/// Trailing-window comparison line.
pub fn render_trend(report: &Report) -> String {
    let t = &report.trend;
    format!(
        "Conversion trend ({} days): {} vs {} ({})\n",
        t.window_days,
        format_percent(t.current_rate),
        format_percent(t.previous_rate),
        t.trend
    )
}

/// Notice shown when the selected range has no rows.
pub fn render_no_data(platform: Platform, range: Option<&DateRange>) -> String {
    match range {
        Some(range) => format!(
            "No data available for {platform} in the selected period ({}).\n",
            format_range(range)
        ),
        None => format!("No dated rows found for {platform}.\n"),
    }
}

fn render_series(series: &[SeriesPoint], fmt: impl Fn(f64) -> String) -> String {
    if series.is_empty() {
        return "  (empty)\n".to_string();
    }
    let width = series.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
    series
        .iter()
        .map(|point| format!("  {:<width$}  {}\n", point.label, fmt(point.value)))
        .collect()
}

fn value_formatter(measure: Measure) -> fn(f64) -> String {
    match measure {
        Measure::Revenue | Measure::Cost | Measure::Cpc | Measure::Cpm | Measure::Cac => format_brl,
        _ => format_amount,
    }
}

fn format_amount(value: f64) -> String {
    format_decimal(value, 2)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn format_range(range: &DateRange) -> String {
    format!("{} - {}", format_date(range.start), format_date(range.end))
}

/// Brazilian currency: `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    format!("R$ {}", format_decimal(value, 2))
}

/// Percentage with a decimal comma: `0.1234` -> `12,34%`.
pub fn format_percent(ratio: f64) -> String {
    format!("{}%", format_decimal(ratio * 100.0, 2))
}

/// Fixed decimals with `.` thousands and `,` decimal separators.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::dataset::{DateCell, DateSystem, Measures, RawDataset, RawRecord};
    use crate::loader::Sources;
    use crate::report::{ReportOutcome, run_report};
    use std::env;
    use std::fs;

    fn report() -> Report {
        let row = |date: &str, revenue: f64| RawRecord {
            date: DateCell::Text(date.to_string()),
            measures: Measures::default()
                .with(Measure::Revenue, revenue)
                .with(Measure::Purchases, 1.0)
                .with(Measure::Cost, 10.0)
                .with(Measure::CartAdds, 4.0)
                .with(Measure::Checkouts, 2.0),
        };
        let table = |platform: Platform, records: Vec<RawRecord>| RawDataset {
            platform,
            date_system: DateSystem::Excel1900,
            columns: platform.required_measures().to_vec(),
            records,
        };
        let sources = Sources {
            meta_ads: table(
                Platform::MetaAds,
                vec![row("2024-01-01", 1500.0), row("2024-01-02", 250.5)],
            ),
            google_ads: table(Platform::GoogleAds, vec![]),
        };

        match run_report(&sources, &ReportConfig::default()) {
            ReportOutcome::Ready(report) => *report,
            other => panic!("expected a report, got {other:?}"),
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_format_decimal_pt_br() {
        assert_eq!(format_decimal(1234567.891, 2), "1.234.567,89");
        assert_eq!(format_decimal(999.0, 2), "999,00");
        assert_eq!(format_decimal(1000.0, 0), "1.000");
        assert_eq!(format_decimal(-1234.5, 2), "-1.234,50");
        assert_eq!(format_decimal(-0.001, 2), "0,00");
    }

    #[test]
    fn test_format_brl_and_percent() {
        assert_eq!(format_brl(1500.0), "R$ 1.500,00");
        assert_eq!(format_percent(0.1234), "12,34%");
        assert_eq!(format_percent(0.0), "0,00%");
    }

    #[test]
    fn test_render_text_contains_kpis() {
        let text = render_text(&report());
        assert!(text.contains("Meta Ads | 01/01/2024 - 02/01/2024"));
        assert!(text.contains("Highest revenue:        01/01 (R$ 1.500,00)"));
        assert!(text.contains("Total revenue:          R$ 1.750,50"));
        assert!(text.contains("Checkout rate:          50,00%"));
        assert!(text.contains("Receita over time"));
    }

    #[test]
    fn test_render_series_aligns_labels() {
        let series = vec![
            SeriesPoint { label: "Monday".into(), value: 3.0 },
            SeriesPoint { label: "Sunday".into(), value: 2.0 },
        ];
        assert_eq!(
            render_series(&series, |v| format_decimal(v, 0)),
            "  Monday  3\n  Sunday  2\n"
        );
        assert_eq!(render_series(&[], format_brl), "  (empty)\n");
    }

    #[test]
    fn test_render_no_data() {
        let msg = render_no_data(Platform::GoogleAds, None);
        assert!(msg.contains("Google Ads"));
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&report());
    }

    #[test]
    fn test_write_json_round_trips_results() {
        let path = temp_path("ads_report_test_report.json");
        write_json(&path, &report()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["platform"], "Meta Ads");
        assert_eq!(value["results"]["total_revenue"], 1750.5);
        assert_eq!(value["results"]["checkout_ratio"], 0.5);
        assert_eq!(value["range"]["start"], "2024-01-01");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("ads_report_test_history.csv");
        let _ = fs::remove_file(&path);

        let report = report();
        append_record(&path, &report).unwrap();
        append_record(&path, &report).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("generated_at")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
