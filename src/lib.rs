pub mod charts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod platform;
pub mod preprocess;
pub mod report;
