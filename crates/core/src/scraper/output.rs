//! Output artifact writer.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

use super::inventory::CanonicalInventoryRow;
use super::types::ScrapeError;

/// Write the run's rows to a timestamped CSV file under `output_dir`.
///
/// UTF-8 without BOM, header row from the canonical column order.
pub fn write_artifact(
    output_dir: &Path,
    rows: &[CanonicalInventoryRow],
    timestamp: DateTime<Local>,
) -> Result<PathBuf, ScrapeError> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| ScrapeError::Output(format!("failed to create {}: {}", output_dir.display(), e)))?;

    let path = output_dir.join(format!("tickets_{}.csv", timestamp.format("%Y%m%d_%H%M%S")));

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| ScrapeError::Output(format!("failed to create {}: {}", path.display(), e)))?;

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ScrapeError::Output(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| ScrapeError::Output(e.to_string()))?;

    info!(rows = rows.len(), path = %path.display(), "wrote output artifact");
    Ok(path)
}
