use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::error::{CalcError, Result};
use crate::utils::validation::display_name_from_slug;

/// Cabin class offered by an airline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Business,
    First,
}

impl CabinClass {
    pub const ALL: [CabinClass; 3] = [CabinClass::Economy, CabinClass::Business, CabinClass::First];
}

impl std::fmt::Display for CabinClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CabinClass::Economy => write!(f, "economy"),
            CabinClass::Business => write!(f, "business"),
            CabinClass::First => write!(f, "first"),
        }
    }
}

impl std::str::FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "economy" => Ok(CabinClass::Economy),
            "business" => Ok(CabinClass::Business),
            "first" => Ok(CabinClass::First),
            _ => Err(format!("Unknown cabin class: {}", s)),
        }
    }
}

/// Domestic or international, decides which limit/fee table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightType {
    Domestic,
    International,
}

impl std::fmt::Display for FlightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightType::Domestic => write!(f, "domestic"),
            FlightType::International => write!(f, "international"),
        }
    }
}

impl std::str::FromStr for FlightType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "domestic" => Ok(FlightType::Domestic),
            "international" => Ok(FlightType::International),
            _ => Err(format!("Unknown flight type: {}", s)),
        }
    }
}

/// Leg of a round trip; only used for history grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripDirection {
    Outbound,
    Inbound,
}

impl std::fmt::Display for TripDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TripDirection::Outbound => write!(f, "outbound"),
            TripDirection::Inbound => write!(f, "inbound"),
        }
    }
}

impl std::str::FromStr for TripDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "outbound" => Ok(TripDirection::Outbound),
            "inbound" => Ok(TripDirection::Inbound),
            _ => Err(format!("Unknown trip direction: {}", s)),
        }
    }
}

/// Excess-fee accounting model. Weight charges per kilogram over the limit,
/// piece charges a flat fee per overweight piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountingSystem {
    Weight,
    Piece,
}

impl std::fmt::Display for AccountingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountingSystem::Weight => write!(f, "weight"),
            AccountingSystem::Piece => write!(f, "piece"),
        }
    }
}

/// One entry of the transient selection list: a catalog item plus how many
/// of it the traveler packed.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    pub item_id: String,
    pub name: String,
    pub unit_weight: f64,
    pub count: u32,
}

/// Catalog item as stored by the item catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub category: String,
}

/// Country wire record. `WeightSystem = true` means the country bills per
/// kilogram; the strict-bool normalization to `uses_piece_system` happens
/// here at the boundary, never inside the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "WeightSystem")]
    pub weight_system: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    pub id: String,
    pub name: String,
    pub uses_piece_system: bool,
}

impl Country {
    pub fn from_record(record: CountryRecord, doc_id: &str) -> Self {
        let id = if record.id.is_empty() {
            doc_id.to_string()
        } else {
            record.id
        };
        let name = record
            .name
            .unwrap_or_else(|| display_name_from_slug(&id));
        Country {
            name,
            uses_piece_system: !record.weight_system,
            id,
        }
    }
}

fn default_currency() -> String {
    "$".to_string()
}

/// Airline wire record, field names as the reference store documents carry
/// them (flight-type prefix `Dom`/`Int` concatenated with the class name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirlineRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "DomesticFlights", default)]
    pub domestic_flights: bool,
    #[serde(rename = "FirstClass", default)]
    pub first_class: bool,
    #[serde(rename = "DomCountry", default)]
    pub dom_country: Option<String>,
    #[serde(rename = "DomEconomyLimit", default)]
    pub dom_economy_limit: f64,
    #[serde(rename = "DomBusinessLimit", default)]
    pub dom_business_limit: f64,
    #[serde(rename = "DomFirstLimit", default)]
    pub dom_first_limit: f64,
    #[serde(rename = "IntEconomyLimit", default)]
    pub int_economy_limit: f64,
    #[serde(rename = "IntBusinessLimit", default)]
    pub int_business_limit: f64,
    #[serde(rename = "IntFirstLimit", default)]
    pub int_first_limit: f64,
    #[serde(rename = "WeightSystemDomEconomyFee", default)]
    pub weight_dom_economy_fee: f64,
    #[serde(rename = "WeightSystemDomBusinessFee", default)]
    pub weight_dom_business_fee: f64,
    #[serde(rename = "WeightSystemDomFirstFee", default)]
    pub weight_dom_first_fee: f64,
    #[serde(rename = "WeightSystemIntEconomyFee", default)]
    pub weight_int_economy_fee: f64,
    #[serde(rename = "WeightSystemIntBusinessFee", default)]
    pub weight_int_business_fee: f64,
    #[serde(rename = "WeightSystemIntFirstFee", default)]
    pub weight_int_first_fee: f64,
    #[serde(rename = "PieceSystemIntEconomyFee", default)]
    pub piece_int_economy_fee: f64,
    #[serde(rename = "PieceSystemIntBusinessFee", default)]
    pub piece_int_business_fee: f64,
    #[serde(rename = "PieceSystemIntFirstFee", default)]
    pub piece_int_first_fee: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(rename = "InternationalCurrency", default = "default_currency")]
    pub international_currency: String,
}

/// Allowance lookup keyed by `(class, flight type)`. A pair that was never
/// inserted (or was configured as zero) is simply absent, which reads as
/// "the airline does not sell this combination".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitTable {
    entries: HashMap<(CabinClass, FlightType), f64>,
}

impl LimitTable {
    pub fn insert(&mut self, class_type: CabinClass, flight_type: FlightType, limit_kg: f64) {
        if limit_kg > 0.0 {
            self.entries.insert((class_type, flight_type), limit_kg);
        }
    }

    pub fn get(&self, class_type: CabinClass, flight_type: FlightType) -> Option<f64> {
        self.entries.get(&(class_type, flight_type)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-kilogram excess fees keyed by `(class, flight type)`. An unset fee
/// reads as zero, the stores treat "no fee configured" as free of charge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeTable {
    entries: HashMap<(CabinClass, FlightType), f64>,
}

impl FeeTable {
    pub fn insert(&mut self, class_type: CabinClass, flight_type: FlightType, fee: f64) {
        self.entries.insert((class_type, flight_type), fee);
    }

    pub fn per_kilogram(&self, class_type: CabinClass, flight_type: FlightType) -> f64 {
        self.entries
            .get(&(class_type, flight_type))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Flat per-piece fees; the piece model only has an international table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PieceFeeTable {
    entries: HashMap<CabinClass, f64>,
}

impl PieceFeeTable {
    pub fn insert(&mut self, class_type: CabinClass, fee: f64) {
        self.entries.insert(class_type, fee);
    }

    pub fn per_piece(&self, class_type: CabinClass) -> f64 {
        self.entries.get(&class_type).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Airline {
    pub id: String,
    pub name: String,
    pub supports_domestic: bool,
    pub supports_first_class: bool,
    pub domestic_home_country: Option<String>,
    pub limits: LimitTable,
    pub weight_fees: FeeTable,
    pub piece_fees: PieceFeeTable,
    pub domestic_currency: String,
    pub international_currency: String,
}

impl Airline {
    pub fn from_record(record: AirlineRecord, doc_id: &str) -> Self {
        let id = if record.id.is_empty() {
            doc_id.to_string()
        } else {
            record.id
        };
        let name = record
            .name
            .unwrap_or_else(|| display_name_from_slug(&id));

        let mut limits = LimitTable::default();
        limits.insert(CabinClass::Economy, FlightType::Domestic, record.dom_economy_limit);
        limits.insert(CabinClass::Business, FlightType::Domestic, record.dom_business_limit);
        limits.insert(CabinClass::First, FlightType::Domestic, record.dom_first_limit);
        limits.insert(CabinClass::Economy, FlightType::International, record.int_economy_limit);
        limits.insert(CabinClass::Business, FlightType::International, record.int_business_limit);
        limits.insert(CabinClass::First, FlightType::International, record.int_first_limit);

        let mut weight_fees = FeeTable::default();
        weight_fees.insert(CabinClass::Economy, FlightType::Domestic, record.weight_dom_economy_fee);
        weight_fees.insert(CabinClass::Business, FlightType::Domestic, record.weight_dom_business_fee);
        weight_fees.insert(CabinClass::First, FlightType::Domestic, record.weight_dom_first_fee);
        weight_fees.insert(CabinClass::Economy, FlightType::International, record.weight_int_economy_fee);
        weight_fees.insert(CabinClass::Business, FlightType::International, record.weight_int_business_fee);
        weight_fees.insert(CabinClass::First, FlightType::International, record.weight_int_first_fee);

        let mut piece_fees = PieceFeeTable::default();
        piece_fees.insert(CabinClass::Economy, record.piece_int_economy_fee);
        piece_fees.insert(CabinClass::Business, record.piece_int_business_fee);
        piece_fees.insert(CabinClass::First, record.piece_int_first_fee);

        // "none" 是參考資料裡「沒有國內母國」的記法
        let domestic_home_country = record
            .dom_country
            .filter(|c| !c.is_empty() && c != "none");

        Airline {
            id,
            name,
            supports_domestic: record.domestic_flights,
            supports_first_class: record.first_class,
            domestic_home_country,
            limits,
            weight_fees,
            piece_fees,
            domestic_currency: record.currency,
            international_currency: record.international_currency,
        }
    }

    pub fn currency_for(&self, flight_type: FlightType) -> &str {
        match flight_type {
            FlightType::Domestic => &self.domestic_currency,
            FlightType::International => &self.international_currency,
        }
    }
}

/// Fully specified flight selection; all fields are mandatory before the
/// engine runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub airline: String,
    pub class_type: CabinClass,
    pub flight_type: FlightType,
    pub trip: TripDirection,
    pub origin: String,
    pub destination: String,
}

/// Selection as the presentation layer accumulates it, field by field.
#[derive(Debug, Clone, Default)]
pub struct SelectionDraft {
    pub airline: Option<String>,
    pub class_type: Option<CabinClass>,
    pub flight_type: Option<FlightType>,
    pub trip: Option<TripDirection>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl SelectionDraft {
    pub fn finalize(&self) -> Result<Selection> {
        let mut missing = Vec::new();
        if self.airline.is_none() {
            missing.push("airline");
        }
        if self.class_type.is_none() {
            missing.push("class");
        }
        if self.flight_type.is_none() {
            missing.push("flight type");
        }
        if self.trip.is_none() {
            missing.push("trip direction");
        }
        if self.origin.is_none() {
            missing.push("origin");
        }
        if self.destination.is_none() {
            missing.push("destination");
        }

        if !missing.is_empty() {
            return Err(CalcError::IncompleteSelectionError {
                missing: missing.join(", "),
            });
        }

        Ok(Selection {
            airline: self.airline.clone().unwrap(),
            class_type: self.class_type.unwrap(),
            flight_type: self.flight_type.unwrap(),
            trip: self.trip.unwrap(),
            origin: self.origin.clone().unwrap(),
            destination: self.destination.clone().unwrap(),
        })
    }
}

/// Result of one calculation. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOutcome {
    pub total_weight: f64,
    pub weight_limit: f64,
    pub limit_exceeded: bool,
    pub system: AccountingSystem,
    pub fee: f64,
    pub currency: String,
    /// Weight comparison line shown to the traveler.
    pub summary: String,
    /// Fee line shown to the traveler.
    pub fee_detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemUsed {
    pub name: String,
    pub count: u32,
    pub weight: f64,
}

/// Persisted calculation log entry. Field names match the history store's
/// existing documents; `limitPassed` historically means "limit exceeded".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationRecord {
    #[serde(rename = "totalWeight")]
    pub total_weight: f64,
    #[serde(rename = "limitPassed")]
    pub limit_passed: bool,
    #[serde(rename = "flightType")]
    pub flight_type: FlightType,
    #[serde(rename = "tripType")]
    pub trip_type: TripDirection,
    #[serde(rename = "classType")]
    pub class_type: CabinClass,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub system: AccountingSystem,
    #[serde(rename = "calculatedAt")]
    pub calculated_at: DateTime<Utc>,
    #[serde(rename = "itemsUsed")]
    pub items_used: Vec<ItemUsed>,
}

impl CalculationRecord {
    /// Document key for the append-only log: the ISO-8601 timestamp with
    /// `:` and `.` replaced so it stays a valid document id.
    pub fn record_key(&self) -> String {
        self.calculated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-")
    }
}

/// Per-item usage counter, keyed by item name in the history store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemUsage {
    #[serde(rename = "Times Used")]
    pub times_used: u64,
    #[serde(rename = "First Time Used")]
    pub first_time_used: DateTime<Utc>,
    #[serde(rename = "Last Time Used")]
    pub last_time_used: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn cabin_class_round_trip() {
        assert_eq!("economy".parse::<CabinClass>().unwrap(), CabinClass::Economy);
        assert_eq!("BUSINESS".parse::<CabinClass>().unwrap(), CabinClass::Business);
        assert_eq!(CabinClass::First.to_string(), "first");
        assert!("premium".parse::<CabinClass>().is_err());
    }

    #[test]
    fn flight_type_and_trip_parse() {
        assert_eq!("domestic".parse::<FlightType>().unwrap(), FlightType::Domestic);
        assert_eq!("Inbound".parse::<TripDirection>().unwrap(), TripDirection::Inbound);
        assert!("layover".parse::<FlightType>().is_err());
    }

    #[test]
    fn country_record_normalizes_to_strict_bool() {
        let rec = CountryRecord {
            id: String::new(),
            name: None,
            weight_system: false,
        };
        let country = Country::from_record(rec, "saudi-arabia");
        assert!(country.uses_piece_system);
        assert_eq!(country.id, "saudi-arabia");
        assert_eq!(country.name, "Saudi Arabia");

        let rec = CountryRecord {
            id: "turkey".to_string(),
            name: Some("Turkey".to_string()),
            weight_system: true,
        };
        let country = Country::from_record(rec, "turkey");
        assert!(!country.uses_piece_system);
    }

    #[test]
    fn airline_record_builds_explicit_tables() {
        let record = AirlineRecord {
            id: "turkish".to_string(),
            name: Some("Turkish Airlines".to_string()),
            domestic_flights: true,
            first_class: false,
            dom_country: Some("turkey".to_string()),
            dom_economy_limit: 15.0,
            int_economy_limit: 23.0,
            int_business_limit: 32.0,
            weight_dom_economy_fee: 3.0,
            weight_int_economy_fee: 5.0,
            piece_int_economy_fee: 50.0,
            currency: "₺".to_string(),
            international_currency: "$".to_string(),
            ..blank_record()
        };

        let airline = Airline::from_record(record, "turkish");
        assert_eq!(airline.name, "Turkish Airlines");
        assert_eq!(
            airline.limits.get(CabinClass::Economy, FlightType::Domestic),
            Some(15.0)
        );
        // First class was never configured: absent, not zero
        assert_eq!(airline.limits.get(CabinClass::First, FlightType::International), None);
        assert_eq!(
            airline.weight_fees.per_kilogram(CabinClass::Economy, FlightType::International),
            5.0
        );
        assert_eq!(airline.piece_fees.per_piece(CabinClass::Economy), 50.0);
        assert_eq!(airline.currency_for(FlightType::Domestic), "₺");
        assert_eq!(airline.currency_for(FlightType::International), "$");
        assert_eq!(airline.domestic_home_country.as_deref(), Some("turkey"));
    }

    #[test]
    fn dom_country_none_is_absent() {
        let record = AirlineRecord {
            id: "qatar".to_string(),
            dom_country: Some("none".to_string()),
            ..blank_record()
        };
        let airline = Airline::from_record(record, "qatar");
        assert_eq!(airline.domestic_home_country, None);
        assert_eq!(airline.name, "Qatar");
    }

    #[test]
    fn zero_limit_reads_as_not_offered() {
        let record = AirlineRecord {
            id: "qatar".to_string(),
            dom_economy_limit: 0.0,
            int_economy_limit: 23.0,
            ..blank_record()
        };
        let airline = Airline::from_record(record, "qatar");
        assert_eq!(airline.limits.get(CabinClass::Economy, FlightType::Domestic), None);
        assert_eq!(
            airline.limits.get(CabinClass::Economy, FlightType::International),
            Some(23.0)
        );
    }

    #[test]
    fn selection_draft_reports_missing_fields() {
        let draft = SelectionDraft {
            airline: Some("turkish".to_string()),
            class_type: Some(CabinClass::Economy),
            ..Default::default()
        };
        let err = draft.finalize().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("flight type"));
        assert!(msg.contains("trip direction"));
        assert!(msg.contains("origin"));
        assert!(msg.contains("destination"));
        assert!(!msg.contains("airline,"));
    }

    #[test]
    fn record_key_replaces_separators() {
        let record = CalculationRecord {
            total_weight: 25.0,
            limit_passed: true,
            flight_type: FlightType::International,
            trip_type: TripDirection::Outbound,
            class_type: CabinClass::Economy,
            airline: "turkish".to_string(),
            origin: "Turkey".to_string(),
            destination: "Germany".to_string(),
            system: AccountingSystem::Weight,
            calculated_at: Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 15).unwrap(),
            items_used: vec![],
        };
        let key = record.record_key();
        assert!(!key.contains(':'));
        assert!(!key.contains('.'));
        assert!(key.starts_with("2024-05-14T09-30-15"));
    }

    #[test]
    fn calculation_record_uses_store_field_names() {
        let record = CalculationRecord {
            total_weight: 25.0,
            limit_passed: true,
            flight_type: FlightType::International,
            trip_type: TripDirection::Inbound,
            class_type: CabinClass::Business,
            airline: "qatar".to_string(),
            origin: "Qatar".to_string(),
            destination: "Turkey".to_string(),
            system: AccountingSystem::Piece,
            calculated_at: Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 15).unwrap(),
            items_used: vec![ItemUsed {
                name: "Laptop".to_string(),
                count: 1,
                weight: 1.5,
            }],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["totalWeight"], 25.0);
        assert_eq!(json["limitPassed"], true);
        assert_eq!(json["tripType"], "inbound");
        assert_eq!(json["classType"], "business");
        assert_eq!(json["system"], "piece");
        assert_eq!(json["itemsUsed"][0]["name"], "Laptop");

        let back: CalculationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn item_usage_uses_store_field_names() {
        let now = Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 15).unwrap();
        let usage = ItemUsage {
            times_used: 3,
            first_time_used: now,
            last_time_used: now,
        };
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["Times Used"], 3);
        assert!(json.get("First Time Used").is_some());
        assert!(json.get("Last Time Used").is_some());
    }

    fn blank_record() -> AirlineRecord {
        serde_json::from_value(serde_json::json!({})).unwrap()
    }
}
