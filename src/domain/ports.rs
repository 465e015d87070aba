use crate::domain::model::{
    Airline, CalculationRecord, CatalogItem, Country, ItemUsage,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read access to the admin-maintained airline/country reference records.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn airline(&self, id: &str) -> Result<Option<Airline>>;

    async fn country(&self, id: &str) -> Result<Option<Country>>;

    /// All airlines, for listings and per-airline history filters.
    async fn airlines(&self) -> Result<Vec<Airline>>;
}

/// Read access to the item catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn items(&self) -> Result<Vec<CatalogItem>>;
}

/// Append-only calculation log plus the per-item usage counters.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one immutable log entry, keyed by its timestamp.
    async fn append(&self, record: &CalculationRecord) -> Result<()>;

    /// Every stored log entry; no ordering guarantee, callers sort.
    async fn records(&self) -> Result<Vec<CalculationRecord>>;

    /// Upserts the usage counter for one item: increment `Times Used` by
    /// `count`, stamp `Last Time Used`, set `First Time Used` on creation.
    async fn track_item_usage(&self, name: &str, count: u32, at: DateTime<Utc>) -> Result<()>;

    async fn item_usage(&self) -> Result<Vec<(String, ItemUsage)>>;
}
