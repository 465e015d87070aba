use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapters::memory::{MemoryCatalogStore, MemoryReferenceStore};
use crate::domain::model::{Airline, AirlineRecord, CatalogItem, Country, CountryRecord};
use crate::utils::error::{CalcError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_weight, Validate};

/// Reference dataset for offline runs: airlines, countries and the item
/// catalog in one TOML file, using the same field names as the hosted
/// store's documents.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Dataset {
    #[serde(default)]
    pub airlines: Vec<AirlineRecord>,
    #[serde(default)]
    pub countries: Vec<CountryRecord>,
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

impl Dataset {
    /// 從 TOML 檔案載入並驗證資料集
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CalcError::InvalidRecordError {
                field: "dataset".to_string(),
                value: path.display().to_string(),
                reason: "Dataset file does not exist".to_string(),
            });
        }

        let content = fs::read_to_string(path)?;
        let dataset: Dataset = toml::from_str(&content)?;
        dataset.validate()?;

        tracing::debug!(
            "Loaded dataset: {} airlines, {} countries, {} items",
            dataset.airlines.len(),
            dataset.countries.len(),
            dataset.items.len()
        );
        Ok(dataset)
    }

    pub fn reference_store(&self) -> MemoryReferenceStore {
        let mut store = MemoryReferenceStore::default();
        for record in &self.airlines {
            let id = record.id.clone();
            store.insert_airline(Airline::from_record(record.clone(), &id));
        }
        for record in &self.countries {
            let id = record.id.clone();
            store.insert_country(Country::from_record(record.clone(), &id));
        }
        store
    }

    pub fn catalog_store(&self) -> MemoryCatalogStore {
        MemoryCatalogStore::new(self.items.clone())
    }
}

impl Validate for Dataset {
    fn validate(&self) -> Result<()> {
        let mut airline_ids = HashSet::new();
        for airline in &self.airlines {
            validate_non_empty_string("airlines.id", &airline.id)?;
            if !airline_ids.insert(airline.id.as_str()) {
                return Err(CalcError::InvalidRecordError {
                    field: "airlines.id".to_string(),
                    value: airline.id.clone(),
                    reason: "Duplicate airline id".to_string(),
                });
            }
        }

        let mut country_ids = HashSet::new();
        for country in &self.countries {
            validate_non_empty_string("countries.id", &country.id)?;
            if !country_ids.insert(country.id.as_str()) {
                return Err(CalcError::InvalidRecordError {
                    field: "countries.id".to_string(),
                    value: country.id.clone(),
                    reason: "Duplicate country id".to_string(),
                });
            }
        }

        for item in &self.items {
            validate_non_empty_string("items.id", &item.id)?;
            validate_non_empty_string("items.name", &item.name)?;
            validate_weight(&format!("items.{}.weight", item.id), item.weight)?;
        }

        Ok(())
    }
}
