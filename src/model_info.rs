//! Metadata sidecar stored next to a trained model artifact.
//!
//! `model_info.json` records how the model was trained: the mapping from
//! integer class labels to human-readable names and the metric parameters
//! of the analyzer the training data came from. All fields are optional
//! and unknown keys are ignored, so older or trimmed sidecars still load.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::curation::LabelConversion;

/// File name of the metadata sidecar inside a model folder.
pub const MODEL_INFO_FILENAME: &str = "model_info.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Mapping from stringified integer class labels to label names.
    #[serde(default)]
    pub label_conversion: Option<BTreeMap<String, serde_json::Value>>,
    /// Metric computation parameters recorded at training time.
    #[serde(default)]
    pub metric_params: Option<MetricParams>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricParams {
    #[serde(default)]
    pub analyzer_0: Option<AnalyzerParams>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerParams {
    #[serde(default)]
    pub quality_metric_params: Option<QualityMetricParams>,
    #[serde(default)]
    pub template_metric_params: Option<TemplateMetricParams>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetricParams {
    #[serde(default)]
    pub qm_params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateMetricParams {
    #[serde(default)]
    pub metrics_kwargs: Option<serde_json::Value>,
}

impl ModelInfo {
    pub fn from_file(path: &Path) -> Result<ModelInfo> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read model metadata from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse model metadata in {}", path.display()))
    }

    /// The label conversion as an integer-keyed map.
    ///
    /// JSON object keys are strings, so the integer class labels come back
    /// stringified. A key that does not parse as an integer makes the whole
    /// mapping unusable; it is dropped with a warning rather than applied
    /// half-way.
    pub fn label_conversion_map(&self) -> Option<LabelConversion> {
        let Some(raw) = self.label_conversion.as_ref() else {
            log::warn!("no label conversion found in model metadata; keeping raw class labels");
            return None;
        };
        let mut map = LabelConversion::new();
        for (key, value) in raw {
            let class = match key.parse::<i32>() {
                Ok(class) => class,
                Err(_) => {
                    log::warn!(
                        "label conversion in model metadata has non-integer key '{}'; ignoring the mapping",
                        key
                    );
                    return None;
                }
            };
            let name = match value {
                serde_json::Value::String(name) => name.clone(),
                other => other.to_string(),
            };
            map.insert(class, name);
        }
        Some(map)
    }

    pub fn quality_metric_params(&self) -> Option<&serde_json::Value> {
        self.metric_params
            .as_ref()?
            .analyzer_0
            .as_ref()?
            .quality_metric_params
            .as_ref()?
            .qm_params
            .as_ref()
    }

    pub fn template_metric_params(&self) -> Option<&serde_json::Value> {
        self.metric_params
            .as_ref()?
            .analyzer_0
            .as_ref()?
            .template_metric_params
            .as_ref()?
            .metrics_kwargs
            .as_ref()
    }
}
