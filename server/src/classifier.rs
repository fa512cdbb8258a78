//! Pre-trained crop classifier.
//!
//! The ranker treats classification as an opaque scoring oracle: a
//! feature vector in, a probability per label out, probabilities summing
//! to one. The shipped implementation is a Gaussian naive-Bayes model
//! whose per-class parameters are exported offline to a JSON file.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use shared_types::SensorReading;

/// Number of features the model was trained on: N, P, K, temperature,
/// soil moisture, pH.
pub const FEATURE_COUNT: usize = 6;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("model file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model: {0}")]
    Model(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f64,
}

pub trait Classifier: Send + Sync {
    /// Score one reading over the fixed label set. Probabilities are
    /// normalized to sum to 1.
    fn classify(&self, reading: &SensorReading) -> Result<Vec<LabelProbability>, ClassifierError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ClassParams {
    label: String,
    prior: f64,
    means: [f64; FEATURE_COUNT],
    variances: [f64; FEATURE_COUNT],
}

#[derive(Debug, Clone, Deserialize)]
struct ModelFile {
    classes: Vec<ClassParams>,
}

/// Gaussian naive-Bayes over the six sensor features.
#[derive(Debug, Clone)]
pub struct GaussianNbClassifier {
    classes: Vec<ClassParams>,
}

impl GaussianNbClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let bytes = std::fs::read(path)?;
        let model: ModelFile = serde_json::from_slice(&bytes)?;
        Self::from_classes(model.classes)
    }

    fn from_classes(classes: Vec<ClassParams>) -> Result<Self, ClassifierError> {
        if classes.is_empty() {
            return Err(ClassifierError::Model("no classes in model file".into()));
        }
        for class in &classes {
            if class.variances.iter().any(|v| *v <= 0.0) {
                return Err(ClassifierError::Model(format!(
                    "non-positive variance for class '{}'",
                    class.label
                )));
            }
        }
        Ok(Self { classes })
    }
}

impl Classifier for GaussianNbClassifier {
    fn classify(&self, reading: &SensorReading) -> Result<Vec<LabelProbability>, ClassifierError> {
        let x = reading.features();

        let log_joint: Vec<f64> = self
            .classes
            .iter()
            .map(|class| {
                let mut ll = class.prior.max(f64::MIN_POSITIVE).ln();
                for i in 0..FEATURE_COUNT {
                    let var = class.variances[i];
                    let d = x[i] - class.means[i];
                    ll += -0.5 * (std::f64::consts::TAU * var).ln() - d * d / (2.0 * var);
                }
                ll
            })
            .collect();

        // Softmax with max-shift so extreme readings don't underflow to
        // an all-zero posterior.
        let max = log_joint.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = log_joint.iter().map(|ll| (ll - max).exp()).collect();
        let total: f64 = weights.iter().sum();

        Ok(self
            .classes
            .iter()
            .zip(weights)
            .map(|(class, w)| LabelProbability {
                label: class.label.clone(),
                probability: w / total,
            })
            .collect())
    }
}
