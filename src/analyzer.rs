//! In-memory view of a spike sorting result and its computed metrics.
//!
//! `Sorting` holds the unit set together with per-unit properties and
//! free-form annotations. `SortingAnalyzer` pairs a sorting with the
//! metric extensions (quality and template metrics) that classification
//! input is assembled from.
use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::metrics::{MetricsFrame, UnitId};

/// A per-unit property array attached to a sorting.
///
/// Property arrays are parallel to the unit order they were written for.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyColumn {
    Text(Vec<String>),
    Integer(Vec<i32>),
    Real(Vec<f32>),
}

impl PropertyColumn {
    pub fn len(&self) -> usize {
        match self {
            PropertyColumn::Text(values) => values.len(),
            PropertyColumn::Integer(values) => values.len(),
            PropertyColumn::Real(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            PropertyColumn::Text(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&[i32]> {
        match self {
            PropertyColumn::Integer(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<&[f32]> {
        match self {
            PropertyColumn::Real(values) => Some(values),
            _ => None,
        }
    }
}

/// The outcome of spike sorting: a set of units plus attached metadata.
#[derive(Debug, Clone, Default)]
pub struct Sorting {
    unit_ids: Vec<UnitId>,
    properties: HashMap<String, PropertyColumn>,
    annotations: HashMap<String, String>,
}

impl Sorting {
    pub fn new(unit_ids: Vec<UnitId>) -> Self {
        Sorting {
            unit_ids,
            properties: HashMap::new(),
            annotations: HashMap::new(),
        }
    }

    pub fn unit_ids(&self) -> &[UnitId] {
        &self.unit_ids
    }

    pub fn n_units(&self) -> usize {
        self.unit_ids.len()
    }

    /// Attach a property array covering every unit of the sorting.
    pub fn set_property(&mut self, name: &str, column: PropertyColumn) -> Result<()> {
        if column.len() != self.unit_ids.len() {
            bail!(
                "property '{}' has {} values but the sorting has {} units",
                name,
                column.len(),
                self.unit_ids.len()
            );
        }
        self.properties.insert(name.to_string(), column);
        Ok(())
    }

    pub fn property(&self, name: &str) -> Option<&PropertyColumn> {
        self.properties.get(name)
    }

    pub fn annotate(&mut self, key: &str, value: &str) {
        self.annotations.insert(key.to_string(), value.to_string());
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(|value| value.as_str())
    }
}

/// A computed metrics table together with the parameters it was computed with.
#[derive(Debug, Clone)]
pub struct MetricsExtension {
    data: MetricsFrame,
    params: serde_json::Value,
}

impl MetricsExtension {
    pub fn new(data: MetricsFrame, params: serde_json::Value) -> Self {
        MetricsExtension { data, params }
    }

    pub fn data(&self) -> &MetricsFrame {
        &self.data
    }

    pub fn params(&self) -> &serde_json::Value {
        &self.params
    }
}

/// A sorting plus the metric extensions computed for it.
#[derive(Debug, Clone)]
pub struct SortingAnalyzer {
    sorting: Sorting,
    quality_metrics: Option<MetricsExtension>,
    template_metrics: Option<MetricsExtension>,
}

impl SortingAnalyzer {
    pub fn new(sorting: Sorting) -> Self {
        SortingAnalyzer {
            sorting,
            quality_metrics: None,
            template_metrics: None,
        }
    }

    pub fn sorting(&self) -> &Sorting {
        &self.sorting
    }

    pub fn sorting_mut(&mut self) -> &mut Sorting {
        &mut self.sorting
    }

    pub fn set_quality_metrics(&mut self, extension: MetricsExtension) {
        self.quality_metrics = Some(extension);
    }

    pub fn set_template_metrics(&mut self, extension: MetricsExtension) {
        self.template_metrics = Some(extension);
    }

    pub fn quality_metrics(&self) -> Option<&MetricsExtension> {
        self.quality_metrics.as_ref()
    }

    pub fn template_metrics(&self) -> Option<&MetricsExtension> {
        self.template_metrics.as_ref()
    }

    /// Merge whatever metric extensions are present into one table.
    ///
    /// With both extensions present the quality metrics come first and the
    /// tables are joined over the union of their units. With neither
    /// present there is nothing to classify on and this fails.
    pub fn computed_metrics(&self) -> Result<MetricsFrame> {
        match (&self.quality_metrics, &self.template_metrics) {
            (Some(quality), Some(template)) => quality.data.hcat(&template.data),
            (Some(quality), None) => Ok(quality.data.clone()),
            (None, Some(template)) => Ok(template.data.clone()),
            (None, None) => {
                bail!("no quality or template metrics have been computed for this sorting")
            }
        }
    }
}
