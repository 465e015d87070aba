use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::model::{CalculationRecord, ItemUsage};
use crate::domain::ports::HistoryStore;
use crate::utils::error::Result;

/// History persisted on disk: one JSON line per calculation record plus a
/// JSON map of item-usage counters next to it.
#[derive(Debug, Clone)]
pub struct JsonlHistoryStore {
    records_path: PathBuf,
    usage_path: PathBuf,
}

impl JsonlHistoryStore {
    pub fn new(records_path: impl Into<PathBuf>) -> Self {
        let records_path = records_path.into();
        let usage_path = records_path.with_extension("usage.json");
        Self {
            records_path,
            usage_path,
        }
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn load_usage(&self) -> Result<HashMap<String, ItemUsage>> {
        if !self.usage_path.exists() {
            return Ok(HashMap::new());
        }
        let data = fs::read_to_string(&self.usage_path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, record: &CalculationRecord) -> Result<()> {
        Self::ensure_parent(&self.records_path)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.records_path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    async fn records(&self) -> Result<Vec<CalculationRecord>> {
        if !self.records_path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.records_path)?;
        let mut records = Vec::new();
        for line in data.lines() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    async fn track_item_usage(&self, name: &str, count: u32, at: DateTime<Utc>) -> Result<()> {
        let mut usage = self.load_usage()?;
        usage
            .entry(name.to_string())
            .and_modify(|counter| {
                counter.times_used += count as u64;
                counter.last_time_used = at;
            })
            .or_insert_with(|| ItemUsage {
                times_used: count as u64,
                first_time_used: at,
                last_time_used: at,
            });

        Self::ensure_parent(&self.usage_path)?;
        fs::write(&self.usage_path, serde_json::to_string_pretty(&usage)?)?;
        Ok(())
    }

    async fn item_usage(&self) -> Result<Vec<(String, ItemUsage)>> {
        let usage = self.load_usage()?;
        let mut entries: Vec<(String, ItemUsage)> = usage.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}
