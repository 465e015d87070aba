pub mod dataset;

use crate::domain::model::{CabinClass, FlightType, SelectionDraft, TripDirection};
use crate::utils::error::{CalcError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "baggage-calc"))]
#[cfg_attr(
    feature = "cli",
    command(about = "Luggage allowance and excess-fee calculator")
)]
pub struct CliConfig {
    #[cfg_attr(feature = "cli", arg(long, default_value = "./dataset.toml"))]
    pub dataset: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "./history.jsonl"))]
    pub history: String,

    #[cfg_attr(feature = "cli", arg(long))]
    pub airline: Option<String>,

    #[cfg_attr(feature = "cli", arg(long))]
    pub class: Option<String>,

    #[cfg_attr(feature = "cli", arg(long))]
    pub flight_type: Option<String>,

    #[cfg_attr(feature = "cli", arg(long))]
    pub trip: Option<String>,

    #[cfg_attr(feature = "cli", arg(long))]
    pub origin: Option<String>,

    #[cfg_attr(feature = "cli", arg(long))]
    pub destination: Option<String>,

    /// Items as name=count pairs, repeatable or comma separated.
    #[cfg_attr(
        feature = "cli",
        arg(long = "item", value_delimiter = ',')
    )]
    pub items: Vec<String>,

    #[cfg_attr(
        feature = "cli",
        arg(long, help = "Print history and analytics summaries")
    )]
    pub analytics: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Enable verbose output"))]
    pub verbose: bool,
}

impl CliConfig {
    /// Builds the selection draft from whatever flags were passed; the
    /// draft reports missing fields when finalized.
    pub fn selection_draft(&self) -> Result<SelectionDraft> {
        let class_type = self
            .class
            .as_deref()
            .map(|s| {
                s.parse::<CabinClass>()
                    .map_err(|reason| CalcError::InvalidRecordError {
                        field: "class".to_string(),
                        value: s.to_string(),
                        reason,
                    })
            })
            .transpose()?;

        let flight_type = self
            .flight_type
            .as_deref()
            .map(|s| {
                s.parse::<FlightType>()
                    .map_err(|reason| CalcError::InvalidRecordError {
                        field: "flight-type".to_string(),
                        value: s.to_string(),
                        reason,
                    })
            })
            .transpose()?;

        let trip = self
            .trip
            .as_deref()
            .map(|s| {
                s.parse::<TripDirection>()
                    .map_err(|reason| CalcError::InvalidRecordError {
                        field: "trip".to_string(),
                        value: s.to_string(),
                        reason,
                    })
            })
            .transpose()?;

        Ok(SelectionDraft {
            airline: self.airline.clone(),
            class_type,
            flight_type,
            trip,
            origin: self.origin.clone(),
            destination: self.destination.clone(),
        })
    }

    /// Parses the `name=count` item arguments.
    pub fn parsed_items(&self) -> Result<Vec<(String, u32)>> {
        let mut parsed = Vec::new();
        for raw in &self.items {
            let Some((name, count)) = raw.split_once('=') else {
                return Err(CalcError::InvalidRecordError {
                    field: "item".to_string(),
                    value: raw.clone(),
                    reason: "Expected name=count".to_string(),
                });
            };
            let count: u32 = count
                .trim()
                .parse()
                .map_err(|_| CalcError::InvalidRecordError {
                    field: "item".to_string(),
                    value: raw.clone(),
                    reason: "Count must be a non-negative integer".to_string(),
                })?;
            parsed.push((name.trim().to_string(), count));
        }
        Ok(parsed)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("dataset", &self.dataset)?;
        validate_non_empty_string("history", &self.history)?;
        // 先把可解析性檢查掉，留給 finalize 只回報缺欄位
        self.selection_draft()?;
        self.parsed_items()?;
        Ok(())
    }
}
