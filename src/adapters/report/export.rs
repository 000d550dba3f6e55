//! JSON export of a finished run.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use crate::application::BacktestRun;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize run: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the whole run (config, series, signals, positions, costs, report)
pub fn export_json<P: AsRef<Path>>(run: &BacktestRun, path: P) -> Result<(), ExportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, run)?;
    tracing::info!("Exported backtest run to {}", path.display());
    Ok(())
}
