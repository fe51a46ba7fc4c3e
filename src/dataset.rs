use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::DatasetError;
use crate::types::ListingRecord;

/// Categorical columns a selector can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    FullName,
    Brand,
    TransmissionType,
    FuelType,
    OwnerType,
    Insurance,
}

impl Column {
    fn get(self, r: &ListingRecord) -> &str {
        match self {
            Column::FullName => &r.full_name,
            Column::Brand => &r.brand,
            Column::TransmissionType => &r.transmission_type,
            Column::FuelType => &r.fuel_type,
            Column::OwnerType => &r.owner_type,
            Column::Insurance => &r.insurance,
        }
    }
}

/// In-memory listings table. Loaded once, never mutated.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    rows: Vec<ListingRecord>,
}

impl DatasetStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();
        for (i, result) in rdr.deserialize().enumerate() {
            // +2: one for the header, one for 1-based numbering
            let row: ListingRecord =
                result.map_err(|source| DatasetError::Row { row: i + 2, source })?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<ListingRecord>) -> Result<Self, DatasetError> {
        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct values of `column` in first-appearance order.
    pub fn distinct(&self, column: Column) -> Vec<String> {
        unique_in_order(self.rows.iter().map(|r| column.get(r)))
    }

    /// Registered years, newest first.
    pub fn distinct_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .rows
            .iter()
            .map(|r| r.registered_year)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years
    }

    /// Model identifiers offered for `brand`; every model when no brand is chosen.
    pub fn models_for_brand(&self, brand: Option<&str>) -> Vec<String> {
        match brand {
            Some(b) => unique_in_order(
                self.rows
                    .iter()
                    .filter(|r| r.brand == b)
                    .map(|r| r.full_name.as_str()),
            ),
            None => self.distinct(Column::FullName),
        }
    }

    pub fn rows_for_model<'a>(
        &'a self,
        full_name: &'a str,
    ) -> impl Iterator<Item = &'a ListingRecord> + 'a {
        self.rows.iter().filter(move |r| r.full_name == full_name)
    }

    /// Engine capacity of the first row carrying `full_name`.
    pub fn engine_capacity(&self, full_name: &str) -> Result<f64, DatasetError> {
        let mut matches = self.rows_for_model(full_name);
        let first = matches
            .next()
            .ok_or_else(|| DatasetError::UnknownModel(full_name.to_string()))?;
        if matches.any(|r| r.engine_capacity != first.engine_capacity) {
            tracing::warn!(
                model = full_name,
                engine_capacity = first.engine_capacity,
                "model has rows with differing engine capacities; using the first"
            );
        }
        Ok(first.engine_capacity)
    }

    /// Mean resale price per registered year for `full_name`, ascending by year.
    pub fn mean_price_by_year(&self, full_name: &str) -> Vec<(i32, f64)> {
        let mut acc: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for r in self.rows_for_model(full_name) {
            let e = acc.entry(r.registered_year).or_insert((0.0, 0));
            e.0 += r.resale_price;
            e.1 += 1;
        }
        acc.into_iter()
            .map(|(year, (sum, n))| (year, sum / n as f64))
            .collect()
    }
}

fn unique_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CSV: &str = "\
full_name,brand,registered_year,transmission_type,fuel_type,owner_type,insurance,engine_capacity,kms_driven,resale_price
Honda City 2015,Honda,2015,Manual,Petrol,First Owner,Comprehensive,1497,42000,500000
Honda City 2015,Honda,2015,Manual,Diesel,Second Owner,Third Party,1497,61000,700000
Honda City 2015,Honda,2017,Automatic,Petrol,First Owner,Comprehensive,1497,18000,900000
Honda Amaze,Honda,2019,Manual,Petrol,First Owner,Zero Dep,1199,25000,620000
Maruti Swift,Maruti,2018,Manual,Petrol,First Owner,Comprehensive,1197,30000,480000
Maruti Swift,Maruti,2016,Manual,CNG,Third Owner,Third Party,1197,90000,310000
";

    pub(crate) fn sample_store() -> DatasetStore {
        DatasetStore::from_reader(SAMPLE_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn distinct_brands_appear_once_in_order() {
        let store = sample_store();
        assert_eq!(store.distinct(Column::Brand), vec!["Honda", "Maruti"]);
        assert_eq!(
            store.distinct(Column::FuelType),
            vec!["Petrol", "Diesel", "CNG"]
        );
    }

    #[test]
    fn years_are_newest_first() {
        assert_eq!(sample_store().distinct_years(), vec![2019, 2018, 2017, 2016, 2015]);
    }

    #[test]
    fn brand_restricts_model_candidates() {
        let store = sample_store();
        assert_eq!(
            store.models_for_brand(Some("Honda")),
            vec!["Honda City 2015", "Honda Amaze"]
        );
        assert_eq!(store.models_for_brand(Some("Maruti")), vec!["Maruti Swift"]);
        assert!(store.models_for_brand(Some("Tata")).is_empty());
        assert_eq!(
            store.models_for_brand(None),
            vec!["Honda City 2015", "Honda Amaze", "Maruti Swift"]
        );
    }

    #[test]
    fn engine_capacity_takes_first_match() {
        let store = sample_store();
        assert_eq!(store.engine_capacity("Honda City 2015").unwrap(), 1497.0);
        assert!(matches!(
            store.engine_capacity("Tata Nano"),
            Err(DatasetError::UnknownModel(_))
        ));
    }

    #[test]
    fn engine_capacity_ignores_later_disagreeing_rows() {
        let header = SAMPLE_CSV.lines().next().unwrap();
        let csv = format!(
            "{header}\n\
             Dup,Acme,2018,Manual,Petrol,First Owner,Comprehensive,1000,10000,300000\n\
             Dup,Acme,2019,Manual,Petrol,First Owner,Comprehensive,2000,12000,350000\n"
        );
        let store = DatasetStore::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(store.engine_capacity("Dup").unwrap(), 1000.0);
    }

    #[test]
    fn mean_price_grouped_by_year_ascending() {
        let store = sample_store();
        assert_eq!(
            store.mean_price_by_year("Honda City 2015"),
            vec![(2015, 600000.0), (2017, 900000.0)]
        );
        assert!(store.mean_price_by_year("Tata Nano").is_empty());
    }

    #[test]
    fn empty_and_malformed_files_are_rejected() {
        let header = SAMPLE_CSV.lines().next().unwrap();
        assert!(matches!(
            DatasetStore::from_reader(header.as_bytes()),
            Err(DatasetError::Empty)
        ));

        let bad = format!("{header}\nHonda City,Honda,not-a-year,Manual,Petrol,First,Comp,1497,1,2\n");
        match DatasetStore::from_reader(bad.as_bytes()) {
            Err(DatasetError::Row { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected row error, got {other:?}"),
        }
    }
}
