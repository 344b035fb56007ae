//! Model-based curation of a spike sorting result.
//!
//! This module contains the classification pipeline: assemble the metric
//! table for the sorting's units, run a trained classifier over it, map
//! the predicted classes through an optional label conversion and write
//! the outcome back onto the sorting as per-unit properties.
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};

use crate::analyzer::{PropertyColumn, SortingAnalyzer};
use crate::error::CurationError;
use crate::io::phy;
use crate::loader;
use crate::metrics::{MetricsFrame, UnitId};
use crate::model_info::ModelInfo;
use crate::models::classifier_trait::ClassifierModel;

/// Property name the predicted label is written under.
pub const PREDICTION_PROPERTY: &str = "label_prediction";
/// Property name the prediction confidence is written under.
pub const CONFIDENCE_PROPERTY: &str = "label_confidence";

/// Mapping from a model's integer class labels to curation label names.
pub type LabelConversion = BTreeMap<i32, String>;

/// A predicted unit label, either the model's raw class or its converted name.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Class(i32),
    Named(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Class(class) => write!(f, "{}", class),
            Label::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Classification output, aligned row by row to the classified table.
#[derive(Debug, Clone)]
pub struct ClassifiedUnits {
    unit_ids: Vec<UnitId>,
    labels: Vec<Label>,
    confidences: Vec<f32>,
}

impl ClassifiedUnits {
    pub fn new(unit_ids: Vec<UnitId>, labels: Vec<Label>, confidences: Vec<f32>) -> Result<Self> {
        if unit_ids.len() != labels.len() || unit_ids.len() != confidences.len() {
            bail!(
                "classification output is misaligned: {} units, {} labels, {} confidences",
                unit_ids.len(),
                labels.len(),
                confidences.len()
            );
        }
        Ok(ClassifiedUnits {
            unit_ids,
            labels,
            confidences,
        })
    }

    pub fn len(&self) -> usize {
        self.unit_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_ids.is_empty()
    }

    pub fn unit_ids(&self) -> &[UnitId] {
        &self.unit_ids
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn confidences(&self) -> &[f32] {
        &self.confidences
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &Label, f32)> + '_ {
        self.unit_ids
            .iter()
            .zip(&self.labels)
            .zip(&self.confidences)
            .map(|((unit_id, label), confidence)| (*unit_id, label, *confidence))
    }

    /// Label and confidence for one unit, if it was classified.
    pub fn get(&self, unit_id: UnitId) -> Option<(&Label, f32)> {
        let pos = self.unit_ids.iter().position(|id| *id == unit_id)?;
        Some((&self.labels[pos], self.confidences[pos]))
    }

    /// Log how many units fell into each label.
    pub fn log_summary(&self) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.to_string()).or_insert(0) += 1;
        }
        let summary = counts
            .iter()
            .map(|(label, count)| format!("{}: {}", label, count))
            .collect::<Vec<_>>()
            .join(", ");
        log::info!("classified {} units ({})", self.len(), summary);
    }
}

/// Applies a trained classifier to the units of a sorting.
pub struct ModelBasedCuration<'a> {
    analyzer: &'a mut SortingAnalyzer,
    model: &'a dyn ClassifierModel,
}

impl<'a> ModelBasedCuration<'a> {
    pub fn new(analyzer: &'a mut SortingAnalyzer, model: &'a dyn ClassifierModel) -> Self {
        ModelBasedCuration { analyzer, model }
    }

    /// Classify every unit and write the outcome onto the sorting.
    ///
    /// The metric table is either the caller-supplied `input_data` or the
    /// analyzer's computed metrics restricted to the sorting's units. The
    /// table is projected onto the model's required metric columns before
    /// prediction, so column order never has to match the training order.
    ///
    /// # Arguments
    ///
    /// * `label_conversion` - Mapping applied to the predicted classes. When
    ///   absent, the mapping recorded in `model_info` is used; with neither,
    ///   raw integer classes are kept.
    /// * `input_data` - Optional pre-assembled metric table. Its units must
    ///   all belong to the sorting.
    /// * `export_to_phy` - Also write `cluster_prediction.tsv` into the
    ///   sorting's annotated phy folder.
    /// * `model_info` - Metadata loaded next to the model, used for the
    ///   default label conversion and for metric parameter checks.
    ///
    /// # Returns
    ///
    /// The per-unit labels and confidences, in the classified table's order.
    /// No property is written when any check fails.
    pub fn predict_labels(
        &mut self,
        label_conversion: Option<&LabelConversion>,
        input_data: Option<MetricsFrame>,
        export_to_phy: bool,
        model_info: Option<&ModelInfo>,
    ) -> Result<ClassifiedUnits> {
        let table = match input_data {
            Some(frame) => self.check_supplied_table(frame)?,
            None => self.assembled_metrics()?,
        };
        let table = table.select_columns(self.model.required_metrics())?;

        self.check_metric_params(model_info);

        let conversion: Option<LabelConversion> = match label_conversion {
            Some(map) => Some(map.clone()),
            None => model_info.and_then(|info| info.label_conversion_map()),
        };

        let x = table.to_model_input();
        let predictions = self.model.predict(&x)?;
        let probabilities = self.model.predict_proba(&x)?;
        if predictions.len() != table.n_units() || probabilities.nrows() != table.n_units() {
            bail!(
                "model '{}' returned {} predictions and {} probability rows for {} units",
                self.model.name(),
                predictions.len(),
                probabilities.nrows(),
                table.n_units()
            );
        }

        let confidences: Vec<f32> = probabilities
            .outer_iter()
            .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max))
            .collect();

        // Label conversion is checked before anything is written back.
        let labels = convert_labels(&predictions, conversion.as_ref())?;

        let prediction_column = match &conversion {
            Some(_) => PropertyColumn::Text(labels.iter().map(|label| label.to_string()).collect()),
            None => PropertyColumn::Integer(predictions.clone()),
        };
        let sorting = self.analyzer.sorting_mut();
        sorting.set_property(PREDICTION_PROPERTY, prediction_column)?;
        sorting.set_property(CONFIDENCE_PROPERTY, PropertyColumn::Real(confidences.clone()))?;

        let classified = ClassifiedUnits::new(table.unit_ids().to_vec(), labels, confidences)?;
        classified.log_summary();

        if export_to_phy {
            phy::export_to_phy(self.analyzer.sorting(), &classified)?;
        }

        Ok(classified)
    }

    fn assembled_metrics(&self) -> Result<MetricsFrame> {
        let computed = self.analyzer.computed_metrics()?;
        let restricted = computed.restrict_to_units(self.analyzer.sorting().unit_ids());
        if restricted.is_empty() {
            return Err(CurationError::NoUnits.into());
        }
        Ok(restricted)
    }

    fn check_supplied_table(&self, frame: MetricsFrame) -> Result<MetricsFrame> {
        if frame.is_empty() {
            return Err(CurationError::NoUnits.into());
        }
        let known: HashSet<UnitId> = self.analyzer.sorting().unit_ids().iter().copied().collect();
        let mut unknown: Vec<UnitId> = frame
            .unit_ids()
            .iter()
            .filter(|unit_id| !known.contains(unit_id))
            .copied()
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(CurationError::UnknownUnits(unknown).into());
        }
        Ok(frame)
    }

    /// Compare the analyzer's metric parameters against those recorded at
    /// training time. Differences are advisory only.
    fn check_metric_params(&self, model_info: Option<&ModelInfo>) {
        let Some(info) = model_info else {
            return;
        };

        if let (Some(extension), Some(expected)) =
            (self.analyzer.quality_metrics(), info.quality_metric_params())
        {
            if extension.params().get("qm_params") != Some(expected) {
                log::warn!(
                    "quality metric parameters differ from those used to train the model; \
                     labels may be inaccurate"
                );
            }
        }
        if let (Some(extension), Some(expected)) = (
            self.analyzer.template_metrics(),
            info.template_metric_params(),
        ) {
            if extension.params().get("metrics_kwargs") != Some(expected) {
                log::warn!(
                    "template metric parameters differ from those used to train the model; \
                     labels may be inaccurate"
                );
            }
        }
    }
}

fn convert_labels(predictions: &[i32], conversion: Option<&LabelConversion>) -> Result<Vec<Label>> {
    let Some(map) = conversion else {
        return Ok(predictions.iter().map(|&class| Label::Class(class)).collect());
    };

    let mut uncovered: Vec<i32> = predictions
        .iter()
        .filter(|class| !map.contains_key(class))
        .copied()
        .collect();
    if !uncovered.is_empty() {
        uncovered.sort_unstable();
        uncovered.dedup();
        return Err(CurationError::LabelMismatch(uncovered).into());
    }

    Ok(predictions
        .iter()
        .map(|class| Label::Named(map[class].clone()))
        .collect())
}

/// Load a model from `model_folder` and label every unit of the sorting.
///
/// This is the one-call entry point: model discovery, metadata loading,
/// classification and property writing in one step.
pub fn auto_label_units(
    analyzer: &mut SortingAnalyzer,
    model_folder: &Path,
    label_conversion: Option<&LabelConversion>,
    export_to_phy: bool,
) -> Result<ClassifiedUnits> {
    let (model, model_info) = loader::load_model_from_folder(model_folder, None)?;
    let mut curation = ModelBasedCuration::new(analyzer, model.as_ref());
    curation.predict_labels(label_conversion, None, export_to_phy, model_info.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_labels_pass_through_without_conversion() {
        let labels = convert_labels(&[1, 0, 1], None).unwrap();
        assert_eq!(
            labels,
            vec![Label::Class(1), Label::Class(0), Label::Class(1)]
        );
    }

    #[test]
    fn uncovered_labels_are_sorted_and_deduplicated() {
        let mut map = LabelConversion::new();
        map.insert(0, "noise".to_string());

        let err = convert_labels(&[5, 0, 3, 5], Some(&map)).unwrap_err();
        match err.downcast_ref::<CurationError>() {
            Some(CurationError::LabelMismatch(uncovered)) => {
                assert_eq!(uncovered, &[3, 5]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn labels_render_like_their_contents() {
        assert_eq!(Label::Class(-1).to_string(), "-1");
        assert_eq!(Label::Named("good".to_string()).to_string(), "good");
    }
}
