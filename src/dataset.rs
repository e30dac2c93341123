//! Row and table types shared by the loader, preprocessor and metrics.
//!
//! Every stage returns a new table; nothing here is mutated after it has been
//! built.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::platform::{Measure, Platform};

/// Epoch used by spreadsheet date serials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateSystem {
    /// Serial 1 is 1900-01-01. Serial 60 is the nonexistent 1900-02-29 and
    /// reads as 1900-02-28.
    #[default]
    Excel1900,
    /// Serial 0 is 1904-01-01.
    Excel1904,
}

impl DateSystem {
    /// Calendar day of a serial, ignoring the time-of-day fraction.
    pub fn date_from_serial(self, serial: f64) -> Option<NaiveDate> {
        if !serial.is_finite() || serial < 0.0 {
            return None;
        }
        let days = serial.floor() as u64;
        let epoch = match self {
            // serials before the phantom leap day are one day behind the rest
            DateSystem::Excel1900 if days < 60 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
            DateSystem::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
            DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
        };
        epoch.checked_add_days(Days::new(days))
    }
}

/// The date cell of a row before preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub enum DateCell {
    Serial(f64),
    Text(String),
    Date(NaiveDate),
    Empty,
}

/// Numeric values of one row, indexed by [`Measure`].
///
/// `None` means the cell was empty, not numeric, or the column is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measures {
    values: [Option<f64>; Measure::ALL.len()],
}

impl Measures {
    pub fn get(&self, measure: Measure) -> Option<f64> {
        self.values[measure as usize]
    }

    /// Value with missing cells counted as zero, as a column sum would.
    pub fn value(&self, measure: Measure) -> f64 {
        self.get(measure).unwrap_or(0.0)
    }

    pub fn with(mut self, measure: Measure, value: f64) -> Self {
        self.values[measure as usize] = Some(value);
        self
    }

    pub fn set(&mut self, measure: Measure, value: Option<f64>) {
        self.values[measure as usize] = value;
    }
}

/// A row as read from the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: DateCell,
    pub measures: Measures,
}

/// One platform table as read from the workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    pub platform: Platform,
    pub date_system: DateSystem,
    /// Measure columns that exist on the sheet, in sheet order.
    pub columns: Vec<Measure>,
    pub records: Vec<RawRecord>,
}

/// A preprocessed row with a valid date and its derived labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    /// English weekday name, e.g. `Monday`.
    pub weekday: String,
    /// `dd/mm` label; not unique across years.
    pub day_label: String,
    pub measures: Measures,
}

impl Record {
    pub fn value(&self, measure: Measure) -> f64 {
        self.measures.value(measure)
    }
}

/// An inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A preprocessed platform table, optionally narrowed to a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub platform: Platform,
    pub columns: Vec<Measure>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, measure: Measure) -> bool {
        self.columns.contains(&measure)
    }

    pub fn min_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).min()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.records.iter().map(|r| r.date).max()
    }

    /// Full span of the data, used as the default report range.
    pub fn date_bounds(&self) -> Option<DateRange> {
        Some(DateRange::new(self.min_date()?, self.max_date()?))
    }

    /// Rows whose date falls within `range`, both ends included.
    pub fn filter(&self, range: &DateRange) -> Dataset {
        self.retain(|r| range.contains(r.date))
    }

    pub fn retain(&self, keep: impl Fn(&Record) -> bool) -> Dataset {
        Dataset {
            platform: self.platform,
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Sum of a measure over all rows; missing cells count as zero.
    pub fn total(&self, measure: Measure) -> f64 {
        self.records.iter().map(|r| r.value(measure)).sum()
    }

    /// Turns the table back into loader rows, dates already parsed.
    pub fn to_raw(&self) -> RawDataset {
        RawDataset {
            platform: self.platform,
            date_system: DateSystem::default(),
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .map(|r| RawRecord {
                    date: DateCell::Date(r.date),
                    measures: r.measures.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(d: NaiveDate, revenue: f64) -> Record {
        Record {
            date: d,
            weekday: d.format("%A").to_string(),
            day_label: d.format("%d/%m").to_string(),
            measures: Measures::default().with(Measure::Revenue, revenue),
        }
    }

    #[test]
    fn test_date_from_serial_1900() {
        let system = DateSystem::Excel1900;
        assert_eq!(system.date_from_serial(45292.0), Some(date(2024, 1, 1)));
        assert_eq!(system.date_from_serial(45292.75), Some(date(2024, 1, 1)));
        assert_eq!(system.date_from_serial(-1.0), None);
        assert_eq!(system.date_from_serial(f64::NAN), None);
    }

    #[test]
    fn test_date_from_serial_1900_leap_bug() {
        let system = DateSystem::Excel1900;
        assert_eq!(system.date_from_serial(1.0), Some(date(1900, 1, 1)));
        assert_eq!(system.date_from_serial(59.0), Some(date(1900, 2, 28)));
        assert_eq!(system.date_from_serial(60.0), Some(date(1900, 2, 28)));
        assert_eq!(system.date_from_serial(61.0), Some(date(1900, 3, 1)));
    }

    #[test]
    fn test_date_from_serial_1904() {
        let system = DateSystem::Excel1904;
        assert_eq!(system.date_from_serial(0.0), Some(date(1904, 1, 1)));
        assert_eq!(system.date_from_serial(43830.0), Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_filter_is_inclusive_on_both_ends() {
        let data = Dataset {
            platform: Platform::MetaAds,
            columns: vec![Measure::Revenue],
            records: vec![
                record(date(2024, 1, 1), 1.0),
                record(date(2024, 1, 2), 2.0),
                record(date(2024, 1, 3), 3.0),
                record(date(2024, 1, 4), 4.0),
            ],
        };

        let filtered = data.filter(&DateRange::new(date(2024, 1, 2), date(2024, 1, 3)));
        let dates: Vec<_> = filtered.records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_filter_with_inverted_range_is_empty() {
        let data = Dataset {
            platform: Platform::MetaAds,
            columns: vec![],
            records: vec![record(date(2024, 1, 2), 1.0)],
        };
        let filtered = data.filter(&DateRange::new(date(2024, 1, 3), date(2024, 1, 1)));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_total_skips_missing_cells() {
        let mut missing = record(date(2024, 1, 2), 0.0);
        missing.measures.set(Measure::Revenue, None);
        let data = Dataset {
            platform: Platform::GoogleAds,
            columns: vec![Measure::Revenue],
            records: vec![record(date(2024, 1, 1), 10.5), missing],
        };
        assert_eq!(data.total(Measure::Revenue), 10.5);
        assert_eq!(data.total(Measure::Cost), 0.0);
    }

    #[test]
    fn test_date_bounds() {
        let data = Dataset {
            platform: Platform::MetaAds,
            columns: vec![],
            records: vec![record(date(2024, 3, 5), 1.0), record(date(2024, 2, 1), 1.0)],
        };
        assert_eq!(
            data.date_bounds(),
            Some(DateRange::new(date(2024, 2, 1), date(2024, 3, 5)))
        );

        let empty = data.retain(|_| false);
        assert_eq!(empty.date_bounds(), None);
    }
}
