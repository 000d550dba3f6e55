//! Reporting Adapters
//!
//! Read-only consumers of a finished `BacktestRun`.

mod console;
mod export;

pub use console::{format_correlation, format_summary, print_summary};
pub use export::{export_json, ExportError};
