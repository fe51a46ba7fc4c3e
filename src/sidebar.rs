use serde::Serialize;

use crate::dataset::{Column, DatasetStore};
use crate::types::{KMS_MAX, KMS_MIN, KMS_STEP};

/// Candidate values for every sidebar control. "Unselected" is always
/// available on top of these and is not listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarOptions {
    pub brands: Vec<String>,
    pub models: Vec<String>,
    pub years: Vec<i32>,
    pub transmissions: Vec<String>,
    pub fuels: Vec<String>,
    pub owners: Vec<String>,
    pub insurances: Vec<String>,
    pub kms: KmsRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KmsRange {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl SidebarOptions {
    /// Builds the option lists; the model list cascades from `brand`.
    pub fn build(store: &DatasetStore, brand: Option<&str>) -> Self {
        Self {
            brands: store.distinct(Column::Brand),
            models: store.models_for_brand(brand),
            years: store.distinct_years(),
            transmissions: store.distinct(Column::TransmissionType),
            fuels: store.distinct(Column::FuelType),
            owners: store.distinct(Column::OwnerType),
            insurances: store.distinct(Column::Insurance),
            kms: KmsRange {
                min: KMS_MIN,
                max: KMS_MAX,
                step: KMS_STEP,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::sample_store;

    #[test]
    fn model_list_follows_brand() {
        let store = sample_store();
        let all = SidebarOptions::build(&store, None);
        assert_eq!(all.models.len(), 3);
        assert_eq!(all.brands, vec!["Honda", "Maruti"]);
        assert_eq!(all.kms, KmsRange { min: 500, max: 150_000, step: 500 });

        let honda = SidebarOptions::build(&store, Some("Honda"));
        assert_eq!(honda.models, vec!["Honda City 2015", "Honda Amaze"]);
        assert_eq!(honda.brands, all.brands);
        assert_eq!(honda.years, all.years);
    }
}
