use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};
use tch::{kind::Kind, CModule, Device, TchError, Tensor};

use crate::error::PredictError;
use crate::model::Predictor;
use crate::types::{FeatureTuple, FeatureValue};

#[derive(Deserialize)]
struct MetaJson {
    feat_list: Vec<String>,
    /// Category vocabularies; a value's code is its index + 1, 0 is reserved for missing/unseen.
    #[serde(default)]
    vocab: HashMap<String, Vec<String>>,
}

/// Maps the feature tuple onto the float vector the TorchScript module expects.
struct FeatureEncoder {
    codes: Vec<Option<HashMap<String, f32>>>,
}

impl FeatureEncoder {
    fn from_meta(meta: &MetaJson) -> Result<Self> {
        if meta.feat_list.len() != FeatureTuple::NAMES.len() {
            bail!(PredictError::Shape {
                got: FeatureTuple::NAMES.len(),
                expected: meta.feat_list.len(),
            });
        }
        let declared_names = meta.feat_list.iter().zip(FeatureTuple::NAMES);
        for (index, (declared, sent)) in declared_names.enumerate() {
            if declared != sent {
                bail!(PredictError::Order {
                    index,
                    declared: declared.clone(),
                    sent: sent.to_string(),
                });
            }
        }

        let codes = meta
            .feat_list
            .iter()
            .map(|name| {
                meta.vocab.get(name).map(|values| {
                    values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (v.clone(), (i + 1) as f32))
                        .collect()
                })
            })
            .collect();
        Ok(Self { codes })
    }

    fn encode(&self, features: &FeatureTuple) -> Result<Vec<f32>, PredictError> {
        let values = features.values();
        if values.len() != self.codes.len() {
            return Err(PredictError::Shape {
                got: values.len(),
                expected: self.codes.len(),
            });
        }
        values
            .iter()
            .zip(&self.codes)
            .enumerate()
            .map(|(index, (v, codes))| match (v, codes) {
                (FeatureValue::Missing, _) => Ok(0.0),
                (FeatureValue::Text(s), Some(codes)) => Ok(codes.get(s).copied().unwrap_or(0.0)),
                (FeatureValue::Number(n), Some(codes)) => {
                    Ok(codes.get(&n.to_string()).copied().unwrap_or(0.0))
                }
                (FeatureValue::Number(n), None) => Ok(*n as f32),
                (FeatureValue::Text(_), None) => Err(PredictError::Type {
                    index,
                    name: FeatureTuple::NAMES[index].to_string(),
                    expected: "number",
                    got: v.kind(),
                }),
            })
            .collect()
    }
}

/// TorchScript regressor exported together with a `meta.json` describing its input layout.
pub struct TorchPredictor {
    model: CModule,
    device: Device,
    name: String,
    encoder: FeatureEncoder,
}

impl TorchPredictor {
    pub fn new(model_path: &str, meta_path: &str) -> Result<Self> {
        let device = Device::Cpu;

        let meta_txt = fs::read_to_string(Path::new(meta_path))
            .with_context(|| format!("failed to read meta at {}", meta_path))?;
        let meta: MetaJson =
            serde_json::from_str(&meta_txt).with_context(|| "failed to parse meta.json")?;
        let encoder = FeatureEncoder::from_meta(&meta)?;

        let model = CModule::load_on_device(model_path, device)
            .with_context(|| format!("failed to load TorchScript {}", model_path))?;

        Ok(Self {
            model,
            device,
            name: format!("torchscript:{}", model_path),
            encoder,
        })
    }
}

fn backend(e: TchError) -> PredictError {
    PredictError::Backend(e.to_string())
}

impl Predictor for TorchPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureTuple) -> Result<f64, PredictError> {
        let x = self.encoder.encode(features)?;
        let input = Tensor::from_slice(&x)
            .f_reshape([1, x.len() as i64])
            .and_then(|t| t.f_to(self.device))
            .map_err(backend)?;

        let t = self.model.forward_ts(&[input]).map_err(backend)?;
        if t.numel() != 1 {
            return Err(PredictError::Backend(format!(
                "unexpected model output size: {:?}",
                t.size()
            )));
        }

        let score = t
            .f_to_kind(Kind::Double)
            .and_then(|t| t.f_reshape([1]))
            .and_then(|t| t.f_double_value(&[0]))
            .map_err(backend)?;
        if !score.is_finite() {
            return Err(PredictError::NonFinite);
        }
        Ok(score)
    }
}

#[cfg(all(test, feature = "torch"))]
mod tests {
    use super::*;
    use crate::types::Selection;

    fn encoder(vocab: serde_json::Value) -> Result<FeatureEncoder> {
        let meta: MetaJson = serde_json::from_value(serde_json::json!({
            "feat_list": FeatureTuple::NAMES,
            "vocab": vocab,
        }))
        .unwrap();
        FeatureEncoder::from_meta(&meta)
    }

    #[test]
    fn vocabulary_codes_start_at_one() {
        let enc = encoder(serde_json::json!({
            "full_name": ["Honda Amaze", "Honda City 2015"],
            "registered_year": ["2014", "2015"],
            "brand": ["Honda"],
            "insurance": ["Comprehensive"],
            "transmission_type": ["Manual"],
            "owner_type": ["First Owner"],
            "fuel_type": ["Petrol"],
        }))
        .unwrap();
        let sel = Selection {
            brand: Some("Honda".into()),
            year: Some(2015),
            fuel: Some("Diesel".into()),
            kms_driven: 20_000,
            ..Selection::default()
        };
        let x = enc
            .encode(&FeatureTuple::assemble("Honda City 2015", 1497.0, &sel))
            .unwrap();
        // full_name, engine, year, insurance, transmission, kms, owner, fuel, brand, age
        assert_eq!(x, vec![2.0, 1497.0, 2.0, 0.0, 0.0, 20_000.0, 0.0, 0.0, 1.0, 8.0]);
    }

    #[test]
    fn text_in_numeric_slot_is_a_type_error() {
        // no vocabulary for full_name: it is read as a number
        let enc = encoder(serde_json::json!({})).unwrap();
        let err = enc
            .encode(&FeatureTuple::assemble("Honda City 2015", 1497.0, &Selection::default()))
            .unwrap_err();
        assert!(matches!(err, PredictError::Type { index: 0, .. }));
    }

    #[test]
    fn feature_list_must_match_tuple_order() {
        let mut names = FeatureTuple::NAMES.to_vec();
        names.swap(0, 1);
        let meta: MetaJson =
            serde_json::from_value(serde_json::json!({ "feat_list": names })).unwrap();
        let err = FeatureEncoder::from_meta(&meta).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PredictError>(),
            Some(PredictError::Order { index: 0, .. })
        ));
    }
}
