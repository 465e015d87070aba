use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::model::{
    Airline, CalculationRecord, CatalogItem, Country, ItemUsage,
};
use crate::domain::ports::{CatalogStore, HistoryStore, ReferenceStore};
use crate::utils::error::Result;

/// Reference records held in memory, loaded once from a dataset.
#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
    airlines: HashMap<String, Airline>,
    countries: HashMap<String, Country>,
}

impl MemoryReferenceStore {
    pub fn insert_airline(&mut self, airline: Airline) {
        self.airlines.insert(airline.id.clone(), airline);
    }

    pub fn insert_country(&mut self, country: Country) {
        self.countries.insert(country.id.clone(), country);
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn airline(&self, id: &str) -> Result<Option<Airline>> {
        Ok(self.airlines.get(id).cloned())
    }

    async fn country(&self, id: &str) -> Result<Option<Country>> {
        Ok(self.countries.get(id).cloned())
    }

    async fn airlines(&self) -> Result<Vec<Airline>> {
        let mut all: Vec<Airline> = self.airlines.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    items: Vec<CatalogItem>,
}

impl MemoryCatalogStore {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn items(&self) -> Result<Vec<CatalogItem>> {
        Ok(self.items.clone())
    }
}

#[derive(Debug, Default)]
struct HistoryInner {
    records: Vec<CalculationRecord>,
    usage: HashMap<String, ItemUsage>,
}

/// History log held in memory; the default store for tests and one-shot
/// CLI runs without a history file.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    inner: RwLock<HistoryInner>,
}

impl MemoryHistoryStore {
    pub fn with_records(records: Vec<CalculationRecord>) -> Self {
        Self {
            inner: RwLock::new(HistoryInner {
                records,
                usage: HashMap::new(),
            }),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: &CalculationRecord) -> Result<()> {
        self.inner.write().await.records.push(record.clone());
        Ok(())
    }

    async fn records(&self) -> Result<Vec<CalculationRecord>> {
        Ok(self.inner.read().await.records.clone())
    }

    async fn track_item_usage(&self, name: &str, count: u32, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .usage
            .entry(name.to_string())
            .and_modify(|usage| {
                usage.times_used += count as u64;
                usage.last_time_used = at;
            })
            .or_insert_with(|| ItemUsage {
                times_used: count as u64,
                first_time_used: at,
                last_time_used: at,
            });
        Ok(())
    }

    async fn item_usage(&self) -> Result<Vec<(String, ItemUsage)>> {
        let inner = self.inner.read().await;
        let mut usage: Vec<(String, ItemUsage)> = inner
            .usage
            .iter()
            .map(|(name, counter)| (name.clone(), counter.clone()))
            .collect();
        usage.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(usage)
    }
}
