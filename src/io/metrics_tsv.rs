//! Reader for tab-separated metric tables.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::Array2;

use crate::metrics::{MetricsFrame, UnitId};

/// Configuration for reading metric TSV files.
#[derive(Debug, Clone)]
pub struct MetricsReaderConfig {
    /// Column name holding the unit identifier.
    pub unit_id_column: String,
}

impl Default for MetricsReaderConfig {
    fn default() -> Self {
        Self {
            unit_id_column: "unit_id".to_string(),
        }
    }
}

/// Read a metrics table from a TSV file with a `unit_id` column.
pub fn read_metrics_tsv<P: AsRef<Path>>(path: P) -> Result<MetricsFrame> {
    read_metrics_tsv_with_config(path, &MetricsReaderConfig::default())
}

/// Read a metrics table using a custom configuration.
///
/// Every column other than the unit id column is parsed as a metric, in
/// header order. Empty fields become NaN.
pub fn read_metrics_tsv_with_config<P: AsRef<Path>>(
    path: P,
    config: &MetricsReaderConfig,
) -> Result<MetricsFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("failed to open metrics file: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("failed to read metrics header row")?
        .clone();

    let unit_idx = headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(&config.unit_id_column))
        .ok_or_else(|| anyhow!("missing unit id column '{}'", config.unit_id_column))?;

    let mut columns = Vec::new();
    let mut metric_indices = Vec::new();
    for (index, name) in headers.iter().enumerate() {
        if index != unit_idx {
            columns.push(name.to_string());
            metric_indices.push(index);
        }
    }

    let mut unit_ids: Vec<UnitId> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("failed to read row {}", row_idx + 1))?;

        let unit_id = record
            .get(unit_idx)
            .ok_or_else(|| anyhow!("missing unit id at row {}", row_idx + 1))?
            .trim()
            .parse::<UnitId>()
            .with_context(|| format!("invalid unit id at row {}", row_idx + 1))?;
        unit_ids.push(unit_id);

        for (&index, column) in metric_indices.iter().zip(&columns) {
            let field = record.get(index).unwrap_or_default().trim();
            let value = if field.is_empty() {
                f64::NAN
            } else {
                field.parse::<f64>().with_context(|| {
                    format!(
                        "invalid value for metric '{}' at row {}",
                        column,
                        row_idx + 1
                    )
                })?
            };
            values.push(value);
        }
    }

    let table = Array2::from_shape_vec((unit_ids.len(), columns.len()), values)
        .context("metrics table is not rectangular")?;
    MetricsFrame::new(unit_ids, columns, table)
}
