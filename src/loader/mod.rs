//! Workbook loading.
//!
//! Reads the "Meta Ads" and "Google Ads" sheets of an `.xlsx` file into two
//! [`RawDataset`]s. Both load or the whole call fails.

pub mod table;
pub mod xlsx;

use std::path::Path;
use tracing::{error, info};

use crate::dataset::RawDataset;
use crate::error::LoadError;
use crate::platform::Platform;

pub use table::dataset_from_grid;
pub use xlsx::{CellValue, Grid, XlsxWorkbook};

/// The two platform tables of a workbook, read-only after load.
#[derive(Debug, Clone)]
pub struct Sources {
    pub meta_ads: RawDataset,
    pub google_ads: RawDataset,
}

impl Sources {
    pub fn get(&self, platform: Platform) -> &RawDataset {
        match platform {
            Platform::MetaAds => &self.meta_ads,
            Platform::GoogleAds => &self.google_ads,
        }
    }
}

/// Opens the workbook at `path` and extracts both platform tables.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_workbook(path: &Path) -> Result<Sources, LoadError> {
    let result = read_sources(path);
    match &result {
        Ok(sources) => info!(
            meta_rows = sources.meta_ads.records.len(),
            google_rows = sources.google_ads.records.len(),
            "Workbook loaded"
        ),
        Err(e) => error!(error = %e, "Workbook load failed"),
    }
    result
}

fn read_sources(path: &Path) -> Result<Sources, LoadError> {
    let mut workbook = XlsxWorkbook::open(path)?;
    let meta_ads = read_platform(&mut workbook, Platform::MetaAds)?;
    let google_ads = read_platform(&mut workbook, Platform::GoogleAds)?;
    Ok(Sources {
        meta_ads,
        google_ads,
    })
}

fn read_platform(workbook: &mut XlsxWorkbook, platform: Platform) -> Result<RawDataset, LoadError> {
    let grid = workbook.read_sheet(platform.sheet_name())?;
    dataset_from_grid(platform, &grid, workbook.date_system())
}
