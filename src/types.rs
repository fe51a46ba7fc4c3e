use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SelectionError;

/// Year the listings were scraped; car age is measured from here.
pub const REFERENCE_YEAR: i32 = 2023;

pub const KMS_MIN: u32 = 500;
pub const KMS_MAX: u32 = 150_000;
pub const KMS_STEP: u32 = 500;

/// One row of the listings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub full_name: String,
    pub brand: String,
    pub registered_year: i32,
    pub transmission_type: String,
    pub fuel_type: String,
    pub owner_type: String,
    pub insurance: String,
    pub engine_capacity: f64,
    pub kms_driven: f64,
    pub resale_price: f64,
}

/// The user's current filter choices. Empty strings from the form count as
/// unselected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub transmission: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub fuel: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub owner: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub insurance: Option<String>,
    #[serde(default = "default_kms")]
    pub kms_driven: u32,
}

fn default_kms() -> u32 {
    KMS_MIN
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            brand: None,
            model: None,
            year: None,
            transmission: None,
            fuel: None,
            owner: None,
            insurance: None,
            kms_driven: KMS_MIN,
        }
    }
}

impl Selection {
    /// Car age relative to [`REFERENCE_YEAR`]; `None` while no year is chosen.
    pub fn age(&self) -> Option<i32> {
        self.year.map(|y| REFERENCE_YEAR - y)
    }

    /// Checks the distance slider bounds (500..=150000, step 500).
    pub fn validate(&self) -> Result<(), SelectionError> {
        let kms = self.kms_driven;
        if !(KMS_MIN..=KMS_MAX).contains(&kms) {
            return Err(SelectionError::KmsOutOfRange(kms));
        }
        if kms % KMS_STEP != 0 {
            return Err(SelectionError::KmsOffStep(kms));
        }
        Ok(())
    }
}

/// A single predictor input slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Text(String),
    Number(f64),
    Missing,
}

impl FeatureValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Text(_) => "text",
            FeatureValue::Number(_) => "number",
            FeatureValue::Missing => "missing",
        }
    }

    fn text(v: &Option<String>) -> Self {
        v.clone().map(FeatureValue::Text).unwrap_or(FeatureValue::Missing)
    }

    fn number(v: Option<f64>) -> Self {
        v.map(FeatureValue::Number).unwrap_or(FeatureValue::Missing)
    }
}

/// Predictor input, in the order the model was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTuple {
    pub full_name: String,
    pub engine_capacity: f64,
    pub registered_year: Option<i32>,
    pub insurance: Option<String>,
    pub transmission_type: Option<String>,
    pub kms_driven: f64,
    pub owner_type: Option<String>,
    pub fuel_type: Option<String>,
    pub brand: Option<String>,
    pub age: Option<i32>,
}

impl FeatureTuple {
    pub const NAMES: [&'static str; 10] = [
        "full_name",
        "engine_capacity",
        "registered_year",
        "insurance",
        "transmission_type",
        "kms_driven",
        "owner_type",
        "fuel_type",
        "brand",
        "age",
    ];

    /// Assembles the tuple for `model` from the selection.
    pub fn assemble(model: &str, engine_capacity: f64, sel: &Selection) -> Self {
        Self {
            full_name: model.to_string(),
            engine_capacity,
            registered_year: sel.year,
            insurance: sel.insurance.clone(),
            transmission_type: sel.transmission.clone(),
            kms_driven: f64::from(sel.kms_driven),
            owner_type: sel.owner.clone(),
            fuel_type: sel.fuel.clone(),
            brand: sel.brand.clone(),
            age: sel.age(),
        }
    }

    pub fn values(&self) -> Vec<FeatureValue> {
        vec![
            FeatureValue::Text(self.full_name.clone()),
            FeatureValue::Number(self.engine_capacity),
            FeatureValue::number(self.registered_year.map(f64::from)),
            FeatureValue::text(&self.insurance),
            FeatureValue::text(&self.transmission_type),
            FeatureValue::Number(self.kms_driven),
            FeatureValue::text(&self.owner_type),
            FeatureValue::text(&self.fuel_type),
            FeatureValue::text(&self.brand),
            FeatureValue::number(self.age.map(f64::from)),
        ]
    }
}

/// Result of one "Predict" click.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PredictionOutcome {
    Success { price: u64, message: String },
    Warning { message: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_is_reference_year_minus_registered_year() {
        let sel = Selection {
            year: Some(2015),
            ..Selection::default()
        };
        assert_eq!(sel.age(), Some(8));
        assert_eq!(Selection::default().age(), None);
    }

    #[test]
    fn kms_bounds_and_step() {
        let mut sel = Selection::default();
        assert!(sel.validate().is_ok());
        sel.kms_driven = 150_000;
        assert!(sel.validate().is_ok());
        sel.kms_driven = 0;
        assert_eq!(sel.validate(), Err(SelectionError::KmsOutOfRange(0)));
        sel.kms_driven = 150_500;
        assert_eq!(sel.validate(), Err(SelectionError::KmsOutOfRange(150_500)));
        sel.kms_driven = 1_250;
        assert_eq!(sel.validate(), Err(SelectionError::KmsOffStep(1_250)));
    }

    #[test]
    fn empty_form_fields_deserialize_as_unselected() {
        let sel: Selection = serde_json::from_str(
            r#"{"brand":"","model":"Honda City 2015","year":null,"fuel":"  "}"#,
        )
        .unwrap();
        assert_eq!(sel.brand, None);
        assert_eq!(sel.model.as_deref(), Some("Honda City 2015"));
        assert_eq!(sel.fuel, None);
        assert_eq!(sel.kms_driven, KMS_MIN);
    }

    #[test]
    fn tuple_values_follow_declared_order() {
        let sel = Selection {
            brand: Some("Honda".into()),
            year: Some(2015),
            kms_driven: 20_000,
            ..Selection::default()
        };
        let tuple = FeatureTuple::assemble("Honda City 2015", 1497.0, &sel);
        let values = tuple.values();
        assert_eq!(values.len(), FeatureTuple::NAMES.len());
        assert_eq!(values[0], FeatureValue::Text("Honda City 2015".into()));
        assert_eq!(values[1], FeatureValue::Number(1497.0));
        assert_eq!(values[2], FeatureValue::Number(2015.0));
        assert_eq!(values[3], FeatureValue::Missing);
        assert_eq!(values[5], FeatureValue::Number(20_000.0));
        assert_eq!(values[8], FeatureValue::Text("Honda".into()));
        assert_eq!(values[9], FeatureValue::Number(8.0));
    }
}
