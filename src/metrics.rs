//! Tabular metric storage shared by the curation pipeline.
//!
//! This module defines `MetricsFrame`, a unit-by-metric table with the
//! merge, restriction and column-selection helpers used to assemble
//! classifier input from quality and template metrics.
use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use ndarray::{Array2, Axis};

use crate::error::CurationError;

/// Identifier of a sorted unit.
pub type UnitId = u32;

/// A unit-by-metric table of f64 values.
///
/// Row order is meaningful and is preserved by every operation; predictions
/// derived from a frame are aligned to its `unit_ids`.
#[derive(Debug, Clone)]
pub struct MetricsFrame {
    unit_ids: Vec<UnitId>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl MetricsFrame {
    /// Build a frame, checking shape and uniqueness of ids and column names.
    pub fn new(unit_ids: Vec<UnitId>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != unit_ids.len() {
            bail!(
                "metrics table has {} rows but {} unit ids",
                values.nrows(),
                unit_ids.len()
            );
        }
        if values.ncols() != columns.len() {
            bail!(
                "metrics table has {} columns but {} column names",
                values.ncols(),
                columns.len()
            );
        }

        let mut seen_units = HashSet::new();
        for unit_id in &unit_ids {
            if !seen_units.insert(*unit_id) {
                bail!("duplicate unit id {} in metrics table", unit_id);
            }
        }
        let mut seen_columns = HashSet::new();
        for column in &columns {
            if !seen_columns.insert(column.as_str()) {
                bail!("duplicate metric column '{}' in metrics table", column);
            }
        }

        Ok(MetricsFrame {
            unit_ids,
            columns,
            values,
        })
    }

    /// An empty frame with no units and no columns.
    pub fn empty() -> Self {
        MetricsFrame {
            unit_ids: Vec::new(),
            columns: Vec::new(),
            values: Array2::zeros((0, 0)),
        }
    }

    pub fn unit_ids(&self) -> &[UnitId] {
        &self.unit_ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_units(&self) -> usize {
        self.unit_ids.len()
    }

    pub fn n_metrics(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_ids.is_empty()
    }

    /// Concatenate two frames column-wise over the union of their units.
    ///
    /// Unit order is this frame's order followed by units that only appear
    /// in `other`, in their original order. Cells with no source value are
    /// filled with NaN. Column names must not overlap.
    pub fn hcat(&self, other: &MetricsFrame) -> Result<MetricsFrame> {
        for column in &other.columns {
            if self.columns.contains(column) {
                bail!("metric column '{}' appears in both tables", column);
            }
        }

        let mut unit_ids = self.unit_ids.clone();
        let left_units: HashSet<UnitId> = self.unit_ids.iter().copied().collect();
        for unit_id in &other.unit_ids {
            if !left_units.contains(unit_id) {
                unit_ids.push(*unit_id);
            }
        }

        let left_cols = self.columns.len();
        let n_cols = left_cols + other.columns.len();
        let mut values = Array2::from_elem((unit_ids.len(), n_cols), f64::NAN);

        // Left rows keep their positions.
        for row in 0..self.unit_ids.len() {
            for col in 0..left_cols {
                values[(row, col)] = self.values[(row, col)];
            }
        }

        let row_of: HashMap<UnitId, usize> = unit_ids
            .iter()
            .enumerate()
            .map(|(row, unit_id)| (*unit_id, row))
            .collect();
        for (src, unit_id) in other.unit_ids.iter().enumerate() {
            let dst = row_of[unit_id];
            for col in 0..other.columns.len() {
                values[(dst, left_cols + col)] = other.values[(src, col)];
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        MetricsFrame::new(unit_ids, columns, values)
    }

    /// Keep only rows whose unit id is in `keep`, preserving row order.
    pub fn restrict_to_units(&self, keep: &[UnitId]) -> MetricsFrame {
        let keep: HashSet<UnitId> = keep.iter().copied().collect();
        let rows: Vec<usize> = self
            .unit_ids
            .iter()
            .enumerate()
            .filter_map(|(row, unit_id)| {
                if keep.contains(unit_id) {
                    Some(row)
                } else {
                    None
                }
            })
            .collect();
        self.take_rows(&rows)
    }

    /// Project the frame onto `wanted` columns, in the given order.
    ///
    /// All absent columns are reported together in a single
    /// [`CurationError::MissingMetrics`].
    pub fn select_columns(&self, wanted: &[String]) -> Result<MetricsFrame> {
        let mut missing = Vec::new();
        let mut indices = Vec::with_capacity(wanted.len());
        for name in wanted {
            match self.columns.iter().position(|column| column == name) {
                Some(index) => indices.push(index),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(CurationError::MissingMetrics(missing).into());
        }

        MetricsFrame::new(
            self.unit_ids.clone(),
            wanted.to_vec(),
            self.values.select(Axis(1), &indices),
        )
    }

    /// Narrow the table to the f32 matrix handed to classifier models.
    ///
    /// Values are narrowed before the infinity check, so f64 values that
    /// overflow f32 are also replaced with NaN.
    pub fn to_model_input(&self) -> Array2<f32> {
        self.values.mapv(|value| {
            let narrowed = value as f32;
            if narrowed.is_infinite() {
                f32::NAN
            } else {
                narrowed
            }
        })
    }

    fn take_rows(&self, rows: &[usize]) -> MetricsFrame {
        MetricsFrame {
            unit_ids: rows.iter().map(|&row| self.unit_ids[row]).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), rows),
        }
    }
}
