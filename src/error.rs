//! Error types for workbook loading and tag parsing.

use thiserror::Error;

/// Failure to produce both platform tables from a workbook.
///
/// Always fatal for the report: no partial datasets are returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to open workbook '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{path}' is not an xlsx workbook: {reason}")]
    NotAWorkbook { path: String, reason: String },
    #[error("failed to read '{part}' from workbook: {reason}")]
    PartRead { part: String, reason: String },
    #[error("malformed XML in '{part}': {reason}")]
    Xml { part: String, reason: String },
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),
    #[error("sheet '{0}' has no header row")]
    EmptySheet(String),
    #[error("sheet '{sheet}' is missing required column '{column}'")]
    MissingColumn { sheet: String, column: String },
}

/// A platform tag that names neither Meta Ads nor Google Ads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized platform '{0}' (expected 'Meta Ads' or 'Google Ads')")]
pub struct InvalidPlatformError(pub String);

/// A metric name that does not match any known sheet column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized metric '{0}'")]
pub struct InvalidMeasureError(pub String);
