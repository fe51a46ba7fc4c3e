use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::error::PredictError;
use crate::types::{FeatureTuple, FeatureValue};

/// Opaque trained model: one feature tuple in, one log-scaled price out.
pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, features: &FeatureTuple) -> Result<f64, PredictError>;
}

// ---------- JSON-exported preprocessing + linear pipeline ----------

#[derive(Debug, Deserialize)]
struct PipelineJson {
    #[serde(default = "default_pipeline_name")]
    name: String,
    intercept: f64,
    features: Vec<FeatureSpec>,
}

fn default_pipeline_name() -> String {
    "pipeline".to_string()
}

#[derive(Debug, Deserialize)]
struct FeatureSpec {
    name: String,
    #[serde(flatten)]
    transform: Transform,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Transform {
    /// One-hot encoding folded into per-category weights; unseen categories score 0.
    Categorical {
        weights: HashMap<String, f64>,
        #[serde(default)]
        missing: f64,
    },
    /// Standard scaling followed by a single weight; missing values take `fill`.
    Numeric {
        mean: f64,
        scale: f64,
        fill: f64,
        weight: f64,
    },
}

pub struct PipelinePredictor {
    name: String,
    intercept: f64,
    features: Vec<FeatureSpec>,
}

impl PipelinePredictor {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model at {}", path.display()))?;
        Self::from_json(&txt).with_context(|| format!("failed to load model {}", path.display()))
    }

    pub fn from_json(txt: &str) -> Result<Self> {
        let spec: PipelineJson =
            serde_json::from_str(txt).context("failed to parse pipeline json")?;

        // The pipeline must have been fitted on exactly the tuple layout we send.
        if spec.features.len() != FeatureTuple::NAMES.len() {
            return Err(PredictError::Shape {
                got: FeatureTuple::NAMES.len(),
                expected: spec.features.len(),
            }
            .into());
        }
        for (index, (declared, sent)) in spec.features.iter().zip(FeatureTuple::NAMES).enumerate() {
            if declared.name != sent {
                return Err(PredictError::Order {
                    index,
                    declared: declared.name.clone(),
                    sent: sent.to_string(),
                }
                .into());
            }
        }

        Ok(Self {
            name: spec.name,
            intercept: spec.intercept,
            features: spec.features,
        })
    }
}

impl Predictor for PipelinePredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureTuple) -> Result<f64, PredictError> {
        let x = features.values();
        if x.len() != self.features.len() {
            return Err(PredictError::Shape {
                got: x.len(),
                expected: self.features.len(),
            });
        }

        let mut score = self.intercept;
        for (index, (spec, value)) in self.features.iter().zip(&x).enumerate() {
            score += match (&spec.transform, value) {
                (Transform::Categorical { weights, .. }, FeatureValue::Text(s)) => {
                    weights.get(s).copied().unwrap_or(0.0)
                }
                // numeric codes (e.g. a year) encoded as categories are keyed by their display form
                (Transform::Categorical { weights, .. }, FeatureValue::Number(n)) => {
                    weights.get(&n.to_string()).copied().unwrap_or(0.0)
                }
                (Transform::Categorical { missing, .. }, FeatureValue::Missing) => *missing,
                (Transform::Numeric { mean, scale, weight, .. }, FeatureValue::Number(n)) => {
                    standardize(*n, *mean, *scale) * weight
                }
                (Transform::Numeric { mean, scale, fill, weight }, FeatureValue::Missing) => {
                    standardize(*fill, *mean, *scale) * weight
                }
                (Transform::Numeric { .. }, FeatureValue::Text(_)) => {
                    return Err(PredictError::Type {
                        index,
                        name: spec.name.clone(),
                        expected: "number",
                        got: value.kind(),
                    })
                }
            };
        }

        if !score.is_finite() {
            return Err(PredictError::NonFinite);
        }
        Ok(score)
    }
}

fn standardize(x: f64, mean: f64, scale: f64) -> f64 {
    if scale == 0.0 {
        x - mean
    } else {
        (x - mean) / scale
    }
}
