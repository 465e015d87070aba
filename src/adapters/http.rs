use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::domain::model::{
    Airline, AirlineRecord, CalculationRecord, CatalogItem, Country, CountryRecord, ItemUsage,
};
use crate::domain::ports::{CatalogStore, HistoryStore, ReferenceStore};
use crate::utils::error::Result;
use crate::utils::validation::validate_url;

async fn fetch_doc<T: DeserializeOwned>(client: &Client, url: &str) -> Result<Option<T>> {
    tracing::debug!("Fetching document: {}", url);
    let response = client.get(url).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let response = response.error_for_status()?;
    Ok(Some(response.json::<T>().await?))
}

/// Airline/country records served by a hosted document store over a plain
/// collection/document REST layout.
#[derive(Debug, Clone)]
pub struct HttpReferenceStore {
    client: Client,
    base_url: String,
}

impl HttpReferenceStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        validate_url("reference store endpoint", &base_url)?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReferenceStore for HttpReferenceStore {
    async fn airline(&self, id: &str) -> Result<Option<Airline>> {
        let url = format!("{}/airlines/{}", self.base_url, id);
        let record: Option<AirlineRecord> = fetch_doc(&self.client, &url).await?;
        Ok(record.map(|r| Airline::from_record(r, id)))
    }

    async fn country(&self, id: &str) -> Result<Option<Country>> {
        let url = format!("{}/countries/{}", self.base_url, id);
        let record: Option<CountryRecord> = fetch_doc(&self.client, &url).await?;
        Ok(record.map(|r| Country::from_record(r, id)))
    }

    async fn airlines(&self) -> Result<Vec<Airline>> {
        let url = format!("{}/airlines", self.base_url);
        let records: Vec<AirlineRecord> = fetch_doc(&self.client, &url).await?.unwrap_or_default();
        Ok(records
            .into_iter()
            .map(|r| {
                let id = r.id.clone();
                Airline::from_record(r, &id)
            })
            .collect())
    }
}

/// Item catalog served by the same document store.
#[derive(Debug, Clone)]
pub struct HttpCatalogStore {
    client: Client,
    base_url: String,
}

impl HttpCatalogStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        validate_url("catalog store endpoint", &base_url)?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogStore for HttpCatalogStore {
    async fn items(&self) -> Result<Vec<CatalogItem>> {
        let url = format!("{}/objects", self.base_url);
        Ok(fetch_doc(&self.client, &url).await?.unwrap_or_default())
    }
}

/// Per-user calculation log and item-usage counters in the document store,
/// nested under the user's document the way the original data lives.
#[derive(Debug, Clone)]
pub struct HttpHistoryStore {
    client: Client,
    base_url: String,
    user_id: String,
}

impl HttpHistoryStore {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        validate_url("history store endpoint", &base_url)?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.into(),
        })
    }

    fn logs_url(&self) -> String {
        format!("{}/users/{}/calculationLogs", self.base_url, self.user_id)
    }

    fn usage_url(&self) -> String {
        format!("{}/users/{}/itemsUsed", self.base_url, self.user_id)
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryStore {
    async fn append(&self, record: &CalculationRecord) -> Result<()> {
        let url = format!("{}/{}", self.logs_url(), record.record_key());
        tracing::debug!("Appending calculation log: {}", url);
        self.client
            .put(&url)
            .json(record)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn records(&self) -> Result<Vec<CalculationRecord>> {
        Ok(fetch_doc(&self.client, &self.logs_url())
            .await?
            .unwrap_or_default())
    }

    async fn track_item_usage(&self, name: &str, count: u32, at: DateTime<Utc>) -> Result<()> {
        let url = format!("{}/{}", self.usage_url(), name);

        // 先讀現況再寫回，和原本文件庫的 upsert 行為一致
        let existing: Option<ItemUsage> = fetch_doc(&self.client, &url).await?;
        let updated = match existing {
            Some(mut usage) => {
                usage.times_used += count as u64;
                usage.last_time_used = at;
                usage
            }
            None => ItemUsage {
                times_used: count as u64,
                first_time_used: at,
                last_time_used: at,
            },
        };

        self.client
            .put(&url)
            .json(&updated)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn item_usage(&self) -> Result<Vec<(String, ItemUsage)>> {
        let usage: HashMap<String, ItemUsage> = fetch_doc(&self.client, &self.usage_url())
            .await?
            .unwrap_or_default();
        let mut entries: Vec<(String, ItemUsage)> = usage.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
