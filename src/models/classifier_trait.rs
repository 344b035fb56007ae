use anyhow::Result;
use ndarray::Array2;

/// The contract between the curation pipeline and a trained classifier.
///
/// The pipeline only needs to know which metric columns a model expects
/// and how to turn a feature matrix into labels and probabilities, so the
/// contract lives here and concrete models sit next to it in this module.
pub trait ClassifierModel {
    /// Metric columns the model was trained on, in training order.
    fn required_metrics(&self) -> &[String];

    /// Predict one integer class label per input row.
    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>>;

    /// Per-class probabilities, one row per input row. Each row sums to 1
    /// and its columns follow the model's class order.
    fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
