//! Turns a worksheet grid into a platform table.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::xlsx::{CellValue, Grid};
use crate::dataset::{DateCell, DateSystem, Measures, RawDataset, RawRecord};
use crate::error::LoadError;
use crate::platform::{DATE_HEADERS, Measure, Platform, is_date_header};

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
struct HeaderMap {
    date: Option<usize>,
    measures: Vec<(Measure, usize)>,
}

impl HeaderMap {
    fn resolve(header: &BTreeMap<usize, CellValue>) -> Self {
        let mut map = HeaderMap::default();
        for (&col, cell) in header {
            let Some(name) = cell.as_text() else {
                continue;
            };
            if is_date_header(name) {
                map.date.get_or_insert(col);
            } else if let Some(measure) = Measure::from_header(name) {
                if !map.measures.iter().any(|(m, _)| *m == measure) {
                    map.measures.push((measure, col));
                }
            }
        }
        map
    }

    fn has(&self, measure: Measure) -> bool {
        self.measures.iter().any(|(m, _)| *m == measure)
    }
}

/// Builds a [`RawDataset`] from a sheet grid.
///
/// The first non-blank row is the header. The date column and the platform's
/// required measure columns must be present.
pub fn dataset_from_grid(
    platform: Platform,
    grid: &Grid,
    date_system: DateSystem,
) -> Result<RawDataset, LoadError> {
    let sheet = platform.sheet_name();

    let mut rows = grid
        .rows()
        .map(|(_, cells)| cells)
        .filter(|cells| !row_is_blank(cells));
    let header_cells = rows
        .next()
        .ok_or_else(|| LoadError::EmptySheet(sheet.to_string()))?;
    let header = HeaderMap::resolve(header_cells);

    let date_col = header.date.ok_or_else(|| LoadError::MissingColumn {
        sheet: sheet.to_string(),
        column: DATE_HEADERS[0].to_string(),
    })?;

    if let Some(missing) = platform
        .required_measures()
        .iter()
        .find(|m| !header.has(**m))
    {
        return Err(LoadError::MissingColumn {
            sheet: sheet.to_string(),
            column: missing.canonical_header().to_string(),
        });
    }

    let mut records = Vec::new();
    let mut unreadable: HashMap<Measure, usize> = HashMap::new();

    for row in rows {
        let date = date_cell(row.get(&date_col));

        let mut measures = Measures::default();
        for &(measure, col) in &header.measures {
            let cell = row.get(&col);
            let value = numeric_value(cell);
            if value.is_none() && cell.is_some_and(|c| !c.is_blank()) {
                *unreadable.entry(measure).or_default() += 1;
            }
            measures.set(measure, value);
        }

        records.push(RawRecord { date, measures });
    }

    for (measure, count) in &unreadable {
        warn!(
            sheet,
            column = measure.canonical_header(),
            count,
            "Non-numeric cells read as missing"
        );
    }

    debug!(
        sheet,
        rows = records.len(),
        columns = header.measures.len(),
        "Sheet table built"
    );

    Ok(RawDataset {
        platform,
        date_system,
        columns: header.measures.iter().map(|(m, _)| *m).collect(),
        records,
    })
}

fn row_is_blank(row: &BTreeMap<usize, CellValue>) -> bool {
    row.values().all(CellValue::is_blank)
}

fn date_cell(cell: Option<&CellValue>) -> DateCell {
    match cell {
        Some(CellValue::Number(n)) => DateCell::Serial(*n),
        Some(CellValue::Text(s)) if !s.trim().is_empty() => DateCell::Text(s.clone()),
        Some(CellValue::Error(e)) => DateCell::Text(e.clone()),
        _ => DateCell::Empty,
    }
}

fn numeric_value(cell: Option<&CellValue>) -> Option<f64> {
    match cell? {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
