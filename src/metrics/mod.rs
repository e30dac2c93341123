//! Marketing KPIs over preprocessed platform tables.
//!
//! This module holds the aggregation functions behind the report (conversion
//! rate, best revenue and ticket days, checkout rate, spend and ROAS, cheapest
//! acquisition weekday, trailing-window trend) and their result types.

pub mod kpi;
pub mod types;
pub mod utility;

pub use kpi::*;
pub use types::*;
