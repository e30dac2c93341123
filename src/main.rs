//! CLI entry point for the ads report tool.
//!
//! Reads the tracking workbook, computes the KPIs of one platform over a
//! date range and prints them, optionally exporting JSON or appending to a
//! CSV history.

use ads_report::{
    config::{ReportConfig, workbook_path_from_env},
    loader::load_workbook,
    metrics::conversion_rate_trailing_window,
    output::{
        append_record, format_date, format_percent, print_pretty, render_no_data, render_text,
        write_json,
    },
    platform::{Measure, Platform},
    preprocess::preprocess,
    report::{ReportOutcome, run_report, summarize_sources},
};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ads_report")]
#[command(about = "KPI report for Meta Ads and Google Ads tracking workbooks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the KPIs of one platform over a date range
    Report {
        #[command(flatten)]
        selection: Selection,

        /// Measures to chart over time (repeatable)
        #[arg(short, long = "metric", value_name = "MEASURE")]
        metrics: Vec<Measure>,

        /// Write the full report as JSON to this file
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// CSV file to append a summary row to
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Compare the conversion rate of the last N days with the N days before
    Trend {
        #[command(flatten)]
        selection: Selection,
    },
    /// List the platform sheets and their date coverage
    Sheets {
        /// Path to the workbook (defaults to $ADS_REPORT_WORKBOOK)
        #[arg(value_name = "WORKBOOK")]
        workbook: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Selection {
    /// Path to the workbook (defaults to $ADS_REPORT_WORKBOOK)
    #[arg(value_name = "WORKBOOK")]
    workbook: Option<PathBuf>,

    /// "meta" or "google"
    #[arg(short, long)]
    platform: Option<Platform>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the range (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Trailing window length in days
    #[arg(short, long)]
    window: Option<u32>,

    /// JSON config file (defaults to $ADS_REPORT_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Selection {
    /// Config file (or defaults) overridden by whatever flags were given.
    fn resolve(&self) -> Result<(PathBuf, ReportConfig)> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::load(path)?,
            None => ReportConfig::from_env()?,
        };
        if let Some(platform) = self.platform {
            config.platform = platform;
        }
        if self.start.is_some() {
            config.start_date = self.start;
        }
        if self.end.is_some() {
            config.end_date = self.end;
        }
        if let Some(window) = self.window {
            config.trend_window_days = window;
        }

        let workbook = self.workbook.clone().unwrap_or_else(workbook_path_from_env);
        debug!(workbook = %workbook.display(), ?config, "Configuration resolved");
        Ok((workbook, config))
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ads_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ads_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            selection,
            metrics,
            json,
            csv,
        } => {
            let (workbook, mut config) = selection.resolve()?;
            if !metrics.is_empty() {
                config.selected_metrics = metrics;
            }

            let sources = load_workbook(&workbook)?;
            match run_report(&sources, &config) {
                ReportOutcome::Ready(report) => {
                    print!("{}", render_text(&report));
                    print_pretty(&report);

                    if let Some(path) = json {
                        write_json(&path, &report)?;
                        info!(path = %path.display(), "JSON report written");
                    }
                    if let Some(path) = csv {
                        append_record(&path, &report)?;
                        info!(path = %path.display(), "Summary appended to CSV history");
                    }
                }
                ReportOutcome::NoData { platform, range } => {
                    print!("{}", render_no_data(platform, range.as_ref()));
                }
            }
        }
        Commands::Trend { selection } => {
            let (workbook, config) = selection.resolve()?;
            let sources = load_workbook(&workbook)?;
            let data = preprocess(sources.get(config.platform));
            let trend =
                conversion_rate_trailing_window(&data, config.platform, config.trend_window_days);

            match (trend.current_window, trend.previous_window) {
                (Some(current), Some(previous)) => {
                    println!(
                        "{}: {} - {} ({}) vs {} - {} ({})",
                        config.platform,
                        format_date(current.start),
                        format_date(current.end),
                        format_percent(trend.current_rate),
                        format_date(previous.start),
                        format_date(previous.end),
                        format_percent(trend.previous_rate),
                    );
                    println!("Trend: {}", trend.trend);
                }
                _ => print!("{}", render_no_data(config.platform, None)),
            }
        }
        Commands::Sheets { workbook } => {
            let workbook = workbook.unwrap_or_else(workbook_path_from_env);
            let sources = load_workbook(&workbook)?;

            for summary in summarize_sources(&sources) {
                let coverage = match (summary.first_date, summary.last_date) {
                    (Some(first), Some(last)) => {
                        format!("{} - {}", format_date(first), format_date(last))
                    }
                    _ => "no valid dates".to_string(),
                };
                let columns: Vec<String> =
                    summary.columns.iter().map(ToString::to_string).collect();
                println!(
                    "{}: {} rows ({} dated), {}; columns: {}",
                    summary.platform,
                    summary.rows,
                    summary.dated_rows,
                    coverage,
                    columns.join(", ")
                );
            }
        }
    }

    Ok(())
}
