//! Date normalization for loaded platform tables.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::dataset::{DateCell, DateSystem, Dataset, RawDataset, Record};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Parses every date cell, drops rows without a usable date and derives the
/// weekday name and `dd/mm` label.
///
/// Row order is preserved. Running the output back through
/// [`Dataset::reprocess`] yields the same table.
pub fn preprocess(raw: &RawDataset) -> Dataset {
    let records: Vec<Record> = raw
        .records
        .iter()
        .filter_map(|row| {
            let date = parse_date(&row.date, raw.date_system)?;
            Some(Record {
                date,
                weekday: weekday_name(date),
                day_label: day_label(date),
                measures: row.measures.clone(),
            })
        })
        .collect();

    let dropped = raw.records.len() - records.len();
    debug!(
        platform = %raw.platform,
        kept = records.len(),
        dropped,
        "Preprocessed platform table"
    );

    Dataset {
        platform: raw.platform,
        columns: raw.columns.clone(),
        records,
    }
}

impl Dataset {
    /// Runs the table through [`preprocess`] again.
    pub fn reprocess(&self) -> Dataset {
        preprocess(&self.to_raw())
    }
}

/// Coerces a date cell to a calendar day; anything unparseable is `None`.
pub fn parse_date(cell: &DateCell, system: DateSystem) -> Option<NaiveDate> {
    match cell {
        DateCell::Date(date) => Some(*date),
        DateCell::Serial(serial) => system.date_from_serial(*serial),
        DateCell::Text(text) => parse_date_text(text, system),
        DateCell::Empty => None,
    }
}

fn parse_date_text(text: &str, system: DateSystem) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        // Sheets sometimes store serials as text.
        .or_else(|| text.parse::<f64>().ok().and_then(|s| system.date_from_serial(s)))
}

/// English weekday name, e.g. `Monday`.
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Day and month as `dd/mm`.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}
