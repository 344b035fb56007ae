//! One-vs-rest ensemble of gradient boosted decision trees.
//!
//! gbdt learners are binary, so a multi-class model is stored as one
//! logistic-loss learner per class plus the class labels and the metric
//! columns the bundle was trained on. The whole bundle serializes to a
//! single JSON document.
use anyhow::{bail, Context, Result};
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::models::classifier_trait::ClassifierModel;

#[derive(Serialize, Deserialize)]
pub struct GbdtBundle {
    required_metrics: Vec<String>,
    classes: Vec<i32>,
    learners: Vec<GBDT>,
}

impl GbdtBundle {
    /// Assemble a bundle from per-class learners.
    ///
    /// `classes[i]` is the label predicted when `learners[i]` scores
    /// highest. Learners are expected to be trained with +1 for rows of
    /// their class and -1 for the rest.
    pub fn new(required_metrics: Vec<String>, classes: Vec<i32>, learners: Vec<GBDT>) -> Result<Self> {
        let bundle = GbdtBundle {
            required_metrics,
            classes,
            learners,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let bundle: GbdtBundle =
            serde_json::from_str(text).context("failed to parse model bundle")?;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize model bundle")
    }

    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    fn validate(&self) -> Result<()> {
        if self.required_metrics.is_empty() {
            bail!("model bundle lists no required metrics");
        }
        if self.classes.is_empty() {
            bail!("model bundle lists no classes");
        }
        if self.classes.len() != self.learners.len() {
            bail!(
                "model bundle has {} classes but {} learners",
                self.classes.len(),
                self.learners.len()
            );
        }
        for (index, class) in self.classes.iter().enumerate() {
            if self.classes[..index].contains(class) {
                bail!("duplicate class label {} in model bundle", class);
            }
        }
        Ok(())
    }

    /// Raw per-class scores, one learner per column.
    ///
    /// With the logistic loss each learner's output is already in (0, 1).
    fn class_scores(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.required_metrics.len() {
            bail!(
                "input has {} feature columns but the model expects {}",
                x.ncols(),
                self.required_metrics.len()
            );
        }

        let mut rows = DataVec::new();
        for row in x.outer_iter() {
            rows.push(Data::new_training_data(row.to_vec(), 1.0, 0.0, None));
        }

        let mut scores = Array2::zeros((x.nrows(), self.classes.len()));
        for (class_index, learner) in self.learners.iter().enumerate() {
            let predicted = learner.predict(&rows);
            for (row_index, value) in predicted.iter().enumerate() {
                scores[(row_index, class_index)] = *value;
            }
        }
        Ok(scores)
    }
}

impl ClassifierModel for GbdtBundle {
    fn required_metrics(&self) -> &[String] {
        &self.required_metrics
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let proba = self.predict_proba(x)?;
        let mut labels = Vec::with_capacity(proba.nrows());
        for row in proba.outer_iter() {
            let mut best = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (index, &score) in row.iter().enumerate() {
                if score > best_score {
                    best = index;
                    best_score = score;
                }
            }
            labels.push(self.classes[best]);
        }
        Ok(labels)
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let scores = self.class_scores(x)?;
        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((scores.nrows(), n_classes));
        for (row_index, row) in scores.outer_iter().enumerate() {
            // One-vs-rest scores do not sum to 1 on their own.
            let clamped: Vec<f32> = row
                .iter()
                .map(|&score| {
                    if score.is_finite() && score > 0.0 {
                        score
                    } else {
                        0.0
                    }
                })
                .collect();
            let total: f32 = clamped.iter().sum();
            for (col, &score) in clamped.iter().enumerate() {
                proba[(row_index, col)] = if total > 0.0 {
                    score / total
                } else {
                    1.0 / n_classes as f32
                };
            }
        }
        Ok(proba)
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbdt::config::Config;

    fn train_learner(features: &[(f32, f32)], positive: &[bool]) -> GBDT {
        let mut config = Config::new();
        config.set_feature_size(2);
        config.set_shrinkage(0.3);
        config.set_max_depth(3);
        config.set_iterations(10);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss("LogLikelyhood");

        let mut train = DataVec::new();
        for ((a, b), is_positive) in features.iter().zip(positive) {
            let label = if *is_positive { 1.0 } else { -1.0 };
            train.push(Data::new_training_data(vec![*a, *b], 1.0, label, None));
        }

        let mut gbdt = GBDT::new(&config);
        gbdt.fit(&mut train);
        gbdt
    }

    #[test]
    fn bundle_predicts_the_separating_class() {
        // Class 0 sits near the origin, class 1 far from it.
        let features: Vec<(f32, f32)> = vec![
            (0.1, 0.2),
            (0.3, 0.1),
            (0.2, 0.3),
            (0.1, 0.1),
            (0.4, 0.2),
            (0.2, 0.1),
            (5.0, 5.2),
            (5.3, 5.1),
            (5.2, 5.3),
            (5.1, 5.1),
            (5.4, 5.2),
            (5.2, 5.1),
        ];
        let near: Vec<bool> = features.iter().map(|(a, _)| *a < 1.0).collect();
        let far: Vec<bool> = near.iter().map(|v| !v).collect();

        let bundle = GbdtBundle::new(
            vec!["a".to_string(), "b".to_string()],
            vec![0, 1],
            vec![
                train_learner(&features, &near),
                train_learner(&features, &far),
            ],
        )
        .unwrap();

        let x = Array2::from_shape_vec((2, 2), vec![0.2, 0.2, 5.2, 5.2]).unwrap();
        let labels = bundle.predict(&x).unwrap();
        assert_eq!(labels, vec![0, 1]);

        let proba = bundle.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (2, 2));
        for row in proba.outer_iter() {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-5);
        }
        assert!(proba[(0, 0)] > proba[(0, 1)]);
        assert!(proba[(1, 1)] > proba[(1, 0)]);
    }

    #[test]
    fn bundle_round_trips_through_json() {
        let features: Vec<(f32, f32)> = vec![
            (0.1, 0.2),
            (0.2, 0.1),
            (0.3, 0.2),
            (5.0, 5.2),
            (5.3, 5.1),
            (5.2, 5.3),
        ];
        let near: Vec<bool> = features.iter().map(|(a, _)| *a < 1.0).collect();
        let far: Vec<bool> = near.iter().map(|v| !v).collect();

        let bundle = GbdtBundle::new(
            vec!["a".to_string(), "b".to_string()],
            vec![3, 7],
            vec![
                train_learner(&features, &near),
                train_learner(&features, &far),
            ],
        )
        .unwrap();

        let json = bundle.to_json().unwrap();
        let reloaded = GbdtBundle::from_json(&json).unwrap();
        assert_eq!(reloaded.classes(), &[3, 7]);
        assert_eq!(reloaded.required_metrics(), bundle.required_metrics());

        let x = Array2::from_shape_vec((1, 2), vec![5.2, 5.2]).unwrap();
        assert_eq!(reloaded.predict(&x).unwrap(), bundle.predict(&x).unwrap());
    }

    #[test]
    fn validation_rejects_mismatched_bundles() {
        assert!(GbdtBundle::new(vec!["a".to_string()], vec![0, 1], vec![]).is_err());
        assert!(GbdtBundle::new(vec![], vec![], vec![]).is_err());

        let features: Vec<(f32, f32)> = vec![(0.1, 0.2), (5.0, 5.2), (0.2, 0.1), (5.1, 5.3)];
        let near: Vec<bool> = features.iter().map(|(a, _)| *a < 1.0).collect();
        let learner = train_learner(&features, &near);
        let other = train_learner(&features, &near);
        assert!(GbdtBundle::new(
            vec!["a".to_string(), "b".to_string()],
            vec![2, 2],
            vec![learner, other],
        )
        .is_err());
    }

    #[test]
    fn feature_count_is_checked() {
        let features: Vec<(f32, f32)> = vec![(0.1, 0.2), (5.0, 5.2), (0.2, 0.1), (5.1, 5.3)];
        let near: Vec<bool> = features.iter().map(|(a, _)| *a < 1.0).collect();
        let far: Vec<bool> = near.iter().map(|v| !v).collect();
        let bundle = GbdtBundle::new(
            vec!["a".to_string(), "b".to_string()],
            vec![0, 1],
            vec![
                train_learner(&features, &near),
                train_learner(&features, &far),
            ],
        )
        .unwrap();

        let narrow = Array2::from_shape_vec((1, 1), vec![0.2]).unwrap();
        assert!(bundle.predict(&narrow).is_err());
    }
}
