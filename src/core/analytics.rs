use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::fees::billable_units;
use crate::domain::model::{
    AccountingSystem, CabinClass, CalculationRecord, FlightType, ItemUsage, TripDirection,
};
use crate::domain::ports::ReferenceStore;
use crate::utils::error::{CalcError, Result};

/// How many recent records a recency window looks at.
const RECENCY_WINDOW: usize = 10;
/// Qualifying records required before a windowed average is presentable.
const MIN_PRESENTABLE: usize = 3;
/// Closed 1 kg histogram buckets before the overflow bucket.
const HISTOGRAM_BUCKETS: usize = 50;
/// Recent violations kept for the history view.
const RECENT_VIOLATIONS: usize = 15;
/// Entries kept in the most-used rankings.
const TOP_ENTRIES: usize = 10;

/// Cooperative cancellation for traversals over large record sets. When
/// the triggering view is dismissed, the caller cancels and partial
/// results are discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CalcError::CancelledError)
        } else {
            Ok(())
        }
    }
}

fn newest_first(records: &[CalculationRecord]) -> Vec<&CalculationRecord> {
    let mut sorted: Vec<&CalculationRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.calculated_at.cmp(&a.calculated_at));
    sorted
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Average luggage weight over the most recent flights in one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct RecencyAverage {
    pub direction: TripDirection,
    pub flights: usize,
    pub average_kg: f64,
}

impl RecencyAverage {
    pub fn message(&self) -> String {
        format!(
            "According to your last {} {} flights, your average luggage weight is {:.1} kilograms.",
            self.flights, self.direction, self.average_kg
        )
    }
}

/// Windowed average over the most recent `min(n, 10)` records in the
/// given direction. Returns `None` below the presentability threshold of
/// three qualifying records.
pub fn recency_average(
    records: &[CalculationRecord],
    direction: TripDirection,
    cancel: &CancelFlag,
) -> Result<Option<RecencyAverage>> {
    let mut matching = Vec::new();
    for record in newest_first(records) {
        cancel.checkpoint()?;
        if record.trip_type == direction {
            matching.push(record);
        }
    }

    if matching.len() < MIN_PRESENTABLE {
        return Ok(None);
    }

    let window = &matching[..matching.len().min(RECENCY_WINDOW)];
    let total: f64 = window.iter().map(|r| r.total_weight).sum();

    Ok(Some(RecencyAverage {
        direction,
        flights: window.len(),
        average_kg: total / window.len() as f64,
    }))
}

/// Difference between average inbound and outbound luggage weight.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalDelta {
    pub outbound_avg: f64,
    pub inbound_avg: f64,
}

impl DirectionalDelta {
    pub fn difference(&self) -> f64 {
        (self.inbound_avg - self.outbound_avg).abs()
    }

    pub fn message(&self) -> String {
        if self.inbound_avg > self.outbound_avg {
            format!(
                "On average, you return with {:.1} kilograms of extra weight from trips.",
                self.difference()
            )
        } else if self.outbound_avg > self.inbound_avg {
            format!(
                "On average, you return with {:.1} less kilograms from trips.",
                self.difference()
            )
        } else {
            "On average, your outbound and inbound luggage weights are equal.".to_string()
        }
    }
}

/// Needs at least one record in each direction; each side averages its
/// most recent ten. Averages compare at one-decimal precision, matching
/// how they are displayed.
pub fn directional_delta(
    records: &[CalculationRecord],
    cancel: &CancelFlag,
) -> Result<Option<DirectionalDelta>> {
    let mut outbound = Vec::new();
    let mut inbound = Vec::new();

    for record in newest_first(records) {
        cancel.checkpoint()?;
        match record.trip_type {
            TripDirection::Outbound => outbound.push(record),
            TripDirection::Inbound => inbound.push(record),
        }
    }

    if outbound.is_empty() || inbound.is_empty() {
        return Ok(None);
    }

    let avg = |side: &[&CalculationRecord]| {
        let window = &side[..side.len().min(RECENCY_WINDOW)];
        let total: f64 = window.iter().map(|r| r.total_weight).sum();
        round_tenth(total / window.len() as f64)
    };

    Ok(Some(DirectionalDelta {
        outbound_avg: avg(&outbound),
        inbound_avg: avg(&inbound),
    }))
}

/// System-wide weight distribution in closed 1 kg buckets plus a `50+`
/// overflow bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightHistogram {
    buckets: Vec<u64>,
    overflow: u64,
}

impl WeightHistogram {
    pub fn bucket(&self, index: usize) -> u64 {
        self.buckets[index]
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum::<u64>() + self.overflow
    }

    /// `("0-1 kg", count)` rows in bucket order, ending with `50+ kg`.
    pub fn rows(&self) -> Vec<(String, u64)> {
        let mut rows: Vec<(String, u64)> = self
            .buckets
            .iter()
            .enumerate()
            .map(|(i, count)| (format!("{}-{} kg", i, i + 1), *count))
            .collect();
        rows.push(("50+ kg".to_string(), self.overflow));
        rows
    }
}

pub fn weight_histogram(
    records: &[CalculationRecord],
    cancel: &CancelFlag,
) -> Result<WeightHistogram> {
    let mut buckets = vec![0_u64; HISTOGRAM_BUCKETS];
    let mut overflow = 0_u64;

    for record in records {
        cancel.checkpoint()?;
        let weight = record.total_weight;
        // 無效的重量資料直接略過
        if !weight.is_finite() || weight < 0.0 {
            continue;
        }
        if weight >= HISTOGRAM_BUCKETS as f64 {
            overflow += 1;
        } else {
            buckets[weight.floor() as usize] += 1;
        }
    }

    Ok(WeightHistogram { buckets, overflow })
}

/// One `(airline, class, flight type)` policy combination and how often it
/// was violated. The limit is re-resolved fresh so the ranking reflects
/// current airline policy, not what the old records saw.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationGroup {
    pub airline: String,
    pub class_type: CabinClass,
    pub flight_type: FlightType,
    pub count: u64,
    pub system: AccountingSystem,
    pub latest_weight: f64,
    /// `None` when the airline record is gone or the combination is no
    /// longer offered.
    pub current_limit: Option<f64>,
}

pub async fn violation_ranking<R: ReferenceStore>(
    records: &[CalculationRecord],
    reference: &R,
    cancel: &CancelFlag,
) -> Result<Vec<ViolationGroup>> {
    let mut groups: HashMap<(String, CabinClass, FlightType), ViolationGroup> = HashMap::new();

    for record in newest_first(records) {
        cancel.checkpoint()?;
        if !record.limit_passed {
            continue;
        }

        let key = (record.airline.clone(), record.class_type, record.flight_type);
        let group = groups.entry(key).or_insert_with(|| ViolationGroup {
            airline: record.airline.clone(),
            class_type: record.class_type,
            flight_type: record.flight_type,
            count: 0,
            // newest-first traversal: the first record seen is the latest
            system: record.system,
            latest_weight: record.total_weight,
            current_limit: None,
        });
        group.count += 1;
    }

    let mut airline_cache: HashMap<String, Option<crate::domain::model::Airline>> = HashMap::new();
    for group in groups.values_mut() {
        cancel.checkpoint()?;
        let airline = match airline_cache.get(&group.airline) {
            Some(cached) => cached.clone(),
            None => {
                let fetched = reference.airline(&group.airline).await?;
                airline_cache.insert(group.airline.clone(), fetched.clone());
                fetched
            }
        };
        group.current_limit =
            airline.and_then(|a| a.limits.get(group.class_type, group.flight_type));
    }

    let mut ranking: Vec<ViolationGroup> = groups.into_values().collect();
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(ranking)
}

/// One past violation with its limit and fee re-resolved from the current
/// reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationDetail {
    pub airline_id: String,
    pub airline_name: String,
    pub class_type: CabinClass,
    pub flight_type: FlightType,
    pub system: AccountingSystem,
    pub total_weight: f64,
    pub weight_limit: f64,
    pub per_unit_fee: f64,
    pub currency: String,
    pub origin: String,
    pub destination: String,
    pub calculated_at: DateTime<Utc>,
}

impl ViolationDetail {
    pub fn excess(&self) -> f64 {
        self.total_weight - self.weight_limit
    }

    /// Total weight-system fee with ceiling rounding; piece violations
    /// have no per-weight total.
    pub fn total_fee(&self) -> Option<f64> {
        match self.system {
            AccountingSystem::Weight => {
                Some(billable_units(self.total_weight, self.weight_limit) * self.per_unit_fee)
            }
            AccountingSystem::Piece => None,
        }
    }

    pub fn fee_line(&self) -> String {
        match self.system {
            AccountingSystem::Piece => {
                format!("Fee: {}{} per piece", self.per_unit_fee, self.currency)
            }
            AccountingSystem::Weight => {
                format!("Fee: {}{} per kilogram", self.per_unit_fee, self.currency)
            }
        }
    }
}

/// The most recent violations (up to 15), newest first. Records whose
/// airline no longer exists in the reference store are skipped.
pub async fn recent_violations<R: ReferenceStore>(
    records: &[CalculationRecord],
    reference: &R,
    cancel: &CancelFlag,
) -> Result<Vec<ViolationDetail>> {
    let mut details = Vec::new();

    for record in newest_first(records) {
        cancel.checkpoint()?;
        if !record.limit_passed {
            continue;
        }
        if details.len() == RECENT_VIOLATIONS {
            break;
        }

        let Some(airline) = reference.airline(&record.airline).await? else {
            continue;
        };

        let weight_limit = airline
            .limits
            .get(record.class_type, record.flight_type)
            .unwrap_or(0.0);

        let (per_unit_fee, currency) = match record.system {
            AccountingSystem::Piece => (
                airline.piece_fees.per_piece(record.class_type),
                airline.international_currency.clone(),
            ),
            AccountingSystem::Weight => (
                airline
                    .weight_fees
                    .per_kilogram(record.class_type, record.flight_type),
                airline.currency_for(record.flight_type).to_string(),
            ),
        };

        details.push(ViolationDetail {
            airline_id: record.airline.clone(),
            airline_name: airline.name.clone(),
            class_type: record.class_type,
            flight_type: record.flight_type,
            system: record.system,
            total_weight: record.total_weight,
            weight_limit,
            per_unit_fee,
            currency,
            origin: record.origin.clone(),
            destination: record.destination.clone(),
            calculated_at: record.calculated_at,
        });
    }

    Ok(details)
}

/// Usage counters sorted by `Times Used`, top ten.
pub fn most_used_items(usage: &[(String, ItemUsage)]) -> Vec<(String, u64)> {
    let mut items: Vec<(String, u64)> = usage
        .iter()
        .filter(|(_, u)| u.times_used > 0)
        .map(|(name, u)| (name.clone(), u.times_used))
        .collect();
    items.sort_by(|a, b| b.1.cmp(&a.1));
    items.truncate(TOP_ENTRIES);
    items
}

/// Origin and destination countries ranked by how often they appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryUsage {
    pub departed: Vec<(String, u64)>,
    pub traveled: Vec<(String, u64)>,
}

pub fn country_usage(records: &[CalculationRecord], cancel: &CancelFlag) -> Result<CountryUsage> {
    let mut origins: HashMap<String, u64> = HashMap::new();
    let mut destinations: HashMap<String, u64> = HashMap::new();

    for record in records {
        cancel.checkpoint()?;
        *origins.entry(record.origin.clone()).or_insert(0) += 1;
        *destinations.entry(record.destination.clone()).or_insert(0) += 1;
    }

    let rank = |counts: HashMap<String, u64>| {
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(TOP_ENTRIES);
        ranked
    };

    Ok(CountryUsage {
        departed: rank(origins),
        traveled: rank(destinations),
    })
}

/// The most recent records in one trip direction, newest first, up to ten.
pub fn recent_by_direction(
    records: &[CalculationRecord],
    direction: TripDirection,
) -> Vec<CalculationRecord> {
    newest_first(records)
        .into_iter()
        .filter(|r| r.trip_type == direction)
        .take(RECENCY_WINDOW)
        .cloned()
        .collect()
}

/// The most recent records of one flight type, newest first, up to ten.
pub fn recent_by_flight_type(
    records: &[CalculationRecord],
    flight_type: FlightType,
) -> Vec<CalculationRecord> {
    newest_first(records)
        .into_iter()
        .filter(|r| r.flight_type == flight_type)
        .take(RECENCY_WINDOW)
        .cloned()
        .collect()
}

/// Previous weights for one airline, newest first, up to ten.
pub fn weights_for_airline(records: &[CalculationRecord], airline_id: &str) -> Vec<CalculationRecord> {
    newest_first(records)
        .into_iter()
        .filter(|r| r.airline == airline_id)
        .take(RECENCY_WINDOW)
        .cloned()
        .collect()
}
