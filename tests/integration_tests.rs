use ads_report::config::ReportConfig;
use ads_report::error::LoadError;
use ads_report::loader::load_workbook;
use ads_report::metrics::{CheckoutPerformance, TrendDirection};
use ads_report::output::{append_record, render_text, write_json};
use ads_report::platform::{Measure, Platform};
use ads_report::report::{Report, ReportOutcome, run_report, run_report_from_path};
use chrono::NaiveDate;
use rust_xlsxwriter::Workbook;
use std::env;
use std::fs;
use std::path::PathBuf;

enum Cell {
    Num(f64),
    Text(&'static str),
    Blank,
}

use Cell::{Blank, Num, Text};

// 2024-01-01 and 2024-01-02 as 1900-system serials.
const JAN_1: f64 = 45292.0;
const JAN_2: f64 = 45293.0;

const META_HEADERS: &[&str] = &[
    "Data",
    "Receita",
    "Compras",
    "Custo",
    "Carrinhos",
    "Finalização de compra",
];
const META_HEADERS_WITHOUT_CARTS: &[&str] =
    &["Data", "Receita", "Compras", "Custo", "Finalização de compra"];
const GOOGLE_HEADERS: &[&str] = &["Date", "Revenue", "Purchases", "Cost", "Impressions"];

fn temp_path(name: &str) -> PathBuf {
    env::temp_dir().join(name)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add_sheet(workbook: &mut Workbook, name: &str, headers: &[&str], rows: &[Vec<Cell>]) {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name).unwrap();

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Num(v) => {
                    sheet.write_number(r, c, *v).unwrap();
                }
                Text(s) => {
                    sheet.write_string(r, c, *s).unwrap();
                }
                Blank => {}
            }
        }
    }
}

fn meta_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![Num(JAN_1), Num(100.0), Num(2.0), Num(50.0), Num(10.0), Num(4.0)],
        vec![Text("03/01/2024"), Num(300.0), Num(3.0), Num(30.0), Num(10.0), Num(3.0)],
        vec![Text("abc"), Num(999.0), Num(9.0), Num(9.0), Num(9.0), Num(9.0)],
        vec![Blank, Blank, Blank, Blank, Blank, Blank],
        vec![Num(JAN_2), Num(50.0), Num(0.0), Num(20.0), Num(5.0), Num(0.0)],
    ]
}

fn google_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![Text("2024-01-01"), Num(10.0), Num(1.0), Num(5.0), Num(1000.0)],
        vec![Text("2024-01-02"), Text("n/a"), Num(1.0), Num(5.0), Num(1000.0)],
    ]
}

fn write_workbook(name: &str, sheets: &[(&str, &[&str], Vec<Vec<Cell>>)]) -> PathBuf {
    let path = temp_path(name);
    let mut workbook = Workbook::new();
    for (sheet, headers, rows) in sheets {
        add_sheet(&mut workbook, sheet, headers, rows);
    }
    workbook.save(&path).unwrap();
    path
}

fn standard_workbook(name: &str) -> PathBuf {
    write_workbook(
        name,
        &[
            ("Meta Ads", META_HEADERS, meta_rows()),
            ("Google Ads", GOOGLE_HEADERS, google_rows()),
        ],
    )
}

fn ready(outcome: ReportOutcome) -> Report {
    match outcome {
        ReportOutcome::Ready(report) => *report,
        other => panic!("expected a report, got {other:?}"),
    }
}

#[test]
fn test_full_pipeline_meta_ads() {
    let path = standard_workbook("ads_report_it_full_pipeline.xlsx");

    let config = ReportConfig {
        trend_window_days: 1,
        selected_metrics: vec![Measure::Revenue, Measure::Impressions],
        ..Default::default()
    };
    let report = ready(run_report_from_path(&path, &config).unwrap());

    assert_eq!(report.range.start, date(2024, 1, 1));
    assert_eq!(report.range.end, date(2024, 1, 3));
    // "abc" and the blank row are gone
    assert_eq!(report.filtered.len(), 3);

    let r = &report.results;
    assert_eq!(r.conversion_rate, 0.2);
    assert_eq!(r.highest_revenue_day, "03/01");
    assert_eq!(r.highest_revenue, 300.0);
    assert_eq!(r.highest_ticket_day, "03/01");
    assert_eq!(r.highest_ticket, 100.0);
    assert_eq!(r.checkout_ratio, CheckoutPerformance::Rate(7.0 / 25.0));
    assert_eq!(r.total_investment, 100.0);
    assert_eq!(r.total_revenue, 450.0);
    assert_eq!(r.roas, 4.5);
    assert_eq!(r.lowest_cac_day, "Wednesday");
    assert_eq!(r.lowest_cac, 10.0);

    assert_eq!(report.trend.current_rate, 0.3);
    assert_eq!(report.trend.previous_rate, 0.0);
    assert_eq!(report.trend.trend, TrendDirection::Increased);

    let labels: Vec<_> = report
        .charts
        .revenue_by_day
        .iter()
        .map(|p| p.label.as_str())
        .collect();
    assert_eq!(labels, vec!["01/01", "02/01", "03/01"]);
    // Meta Ads has no impressions column, so only revenue gets a chart
    assert_eq!(report.charts.metrics.len(), 1);
    assert_eq!(report.charts.metrics[0].max, Some(300.0));

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_google_ads_with_english_headers() {
    let path = standard_workbook("ads_report_it_google.xlsx");
    let sources = load_workbook(&path).unwrap();

    // the non-numeric revenue cell is read as missing
    assert_eq!(sources.google_ads.records[1].measures.get(Measure::Revenue), None);

    let config = ReportConfig {
        platform: Platform::GoogleAds,
        ..Default::default()
    };
    let report = ready(run_report(&sources, &config));

    assert_eq!(report.results.conversion_rate, 2.0 / 2000.0);
    assert_eq!(report.results.total_revenue, 10.0);
    assert_eq!(report.results.checkout_ratio, CheckoutPerformance::NotApplicable);
    assert_eq!(report.results.lowest_cac_day, "Monday");

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_sheet_fails_whole_load() {
    let path = write_workbook(
        "ads_report_it_missing_sheet.xlsx",
        &[("Meta Ads", META_HEADERS, meta_rows())],
    );

    let err = load_workbook(&path).unwrap_err();
    assert!(matches!(err, LoadError::MissingSheet(ref name) if name == "Google Ads"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_required_column() {
    let path = write_workbook(
        "ads_report_it_missing_column.xlsx",
        &[
            (
                "Meta Ads",
                META_HEADERS_WITHOUT_CARTS,
                vec![vec![Num(JAN_1), Num(1.0), Num(1.0), Num(1.0), Num(1.0)]],
            ),
            ("Google Ads", GOOGLE_HEADERS, google_rows()),
        ],
    );

    let err = load_workbook(&path).unwrap_err();
    match err {
        LoadError::MissingColumn { sheet, column } => {
            assert_eq!(sheet, "Meta Ads");
            assert_eq!(column, "Carrinhos");
        }
        other => panic!("unexpected error: {other}"),
    }

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_range_without_rows_is_no_data() {
    let path = standard_workbook("ads_report_it_no_data.xlsx");

    let config = ReportConfig {
        start_date: Some(date(2023, 6, 1)),
        end_date: Some(date(2023, 6, 30)),
        ..Default::default()
    };
    let outcome = run_report_from_path(&path, &config).unwrap();
    assert!(matches!(
        outcome,
        ReportOutcome::NoData {
            platform: Platform::MetaAds,
            range: Some(_)
        }
    ));

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_exports_from_loaded_workbook() {
    let path = standard_workbook("ads_report_it_exports.xlsx");
    let json_path = temp_path("ads_report_it_exports.json");
    let csv_path = temp_path("ads_report_it_exports.csv");
    let _ = fs::remove_file(&csv_path);

    let report = ready(run_report_from_path(&path, &ReportConfig::default()).unwrap());

    let text = render_text(&report);
    assert!(text.contains("R$ 450,00"));

    write_json(&json_path, &report).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["results"]["lowest_cac_day"], "Wednesday");

    append_record(&csv_path, &report).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("Meta Ads"));

    for p in [&path, &json_path, &csv_path] {
        fs::remove_file(p).unwrap();
    }
}
