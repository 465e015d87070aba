use chrono::{DateTime, Utc};

use crate::core::{fees, limits, system, weight};
use crate::domain::model::{
    AccountingSystem, CalculationOutcome, CalculationRecord, ItemUsed, SelectedItem, Selection,
};
use crate::domain::ports::{HistoryStore, ReferenceStore};
use crate::utils::error::{CalcError, Result};
use crate::utils::validation::display_name_from_slug;

/// Runs one calculation end to end: weight aggregation, reference lookup,
/// limit resolution, fee computation, message composition and history
/// logging. Stateless between invocations; every run is a fresh one-shot
/// traversal.
pub struct CalculationEngine<R: ReferenceStore, H: HistoryStore> {
    reference: R,
    history: H,
}

impl<R: ReferenceStore, H: HistoryStore> CalculationEngine<R, H> {
    pub fn new(reference: R, history: H) -> Self {
        Self { reference, history }
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Runs a calculation stamped with the current time.
    pub async fn run(
        &self,
        selection: &Selection,
        items: &[SelectedItem],
    ) -> Result<CalculationOutcome> {
        self.run_at(selection, items, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit timestamp for the
    /// persisted record.
    pub async fn run_at(
        &self,
        selection: &Selection,
        items: &[SelectedItem],
        now: DateTime<Utc>,
    ) -> Result<CalculationOutcome> {
        // 先加總重量，空的選擇在這裡就擋下來
        let total_weight = weight::aggregate(items)?;
        tracing::debug!("Total weight calculated: {:.2} kg", total_weight);

        let airline = self
            .reference
            .airline(&selection.airline)
            .await?
            .ok_or_else(|| CalcError::ReferenceDataMissingError {
                kind: "airline".to_string(),
                id: selection.airline.clone(),
            })?;
        let origin = self
            .reference
            .country(&selection.origin)
            .await?
            .ok_or_else(|| CalcError::ReferenceDataMissingError {
                kind: "country".to_string(),
                id: selection.origin.clone(),
            })?;
        let destination = self
            .reference
            .country(&selection.destination)
            .await?
            .ok_or_else(|| CalcError::ReferenceDataMissingError {
                kind: "country".to_string(),
                id: selection.destination.clone(),
            })?;

        let resolution = system::resolve_system(&origin, &destination);
        tracing::debug!(
            "Accounting system for {} -> {}: {}",
            origin.id,
            destination.id,
            resolution.system
        );

        let weight_limit =
            limits::resolve_limit(&airline, selection.class_type, selection.flight_type)?;
        tracing::debug!(
            "Weight limit for {} {}: {} kg",
            selection.class_type,
            selection.flight_type,
            weight_limit
        );

        let limit_exceeded = total_weight > weight_limit;
        let difference = (total_weight - weight_limit).abs();

        let summary = if limit_exceeded {
            format!(
                "Your total weight is {:.1} kilograms. You exceed the airline policy by {:.1} kilograms.",
                total_weight, difference
            )
        } else {
            format!(
                "Your total weight is {:.1} kilograms. You are {:.1} kilograms away from passing the airline policy.",
                total_weight, difference
            )
        };

        let (fee, currency, fee_detail) = if limit_exceeded {
            let breakdown = fees::compute_fee(
                resolution.system,
                selection.class_type,
                selection.flight_type,
                &airline,
                total_weight,
                weight_limit,
            );
            (breakdown.fee, breakdown.currency, breakdown.detail)
        } else {
            let currency = match resolution.system {
                AccountingSystem::Piece => airline.international_currency.clone(),
                AccountingSystem::Weight => {
                    airline.currency_for(selection.flight_type).to_string()
                }
            };
            (
                0.0,
                currency,
                "You do not pay a fine since you did not exceed any policies. Good job!"
                    .to_string(),
            )
        };

        let outcome = CalculationOutcome {
            total_weight,
            weight_limit,
            limit_exceeded,
            system: resolution.system,
            fee,
            currency,
            summary,
            fee_detail,
        };

        let record = CalculationRecord {
            total_weight,
            limit_passed: limit_exceeded,
            flight_type: selection.flight_type,
            trip_type: selection.trip,
            class_type: selection.class_type,
            airline: selection.airline.clone(),
            origin: display_name_from_slug(&selection.origin),
            destination: display_name_from_slug(&selection.destination),
            system: resolution.system,
            calculated_at: now,
            items_used: items
                .iter()
                .filter(|item| item.count > 0)
                .map(|item| ItemUsed {
                    name: item.name.clone(),
                    count: item.count,
                    weight: item.unit_weight,
                })
                .collect(),
        };

        self.history.append(&record).await?;
        tracing::debug!("Logged calculation result: {}", record.record_key());

        // 每個有數量的物品都要累計使用次數
        for item in items.iter().filter(|item| item.count > 0) {
            self.history
                .track_item_usage(&item.name, item.count, now)
                .await?;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryHistoryStore, MemoryReferenceStore};
    use crate::domain::model::{
        AirlineRecord, CabinClass, Country, FlightType, TripDirection,
    };
    use chrono::TimeZone;

    fn reference() -> MemoryReferenceStore {
        let record: AirlineRecord = serde_json::from_value(serde_json::json!({
            "name": "Turkish Airlines",
            "DomesticFlights": true,
            "FirstClass": false,
            "DomCountry": "turkey",
            "DomEconomyLimit": 23.0,
            "IntEconomyLimit": 23.0,
            "IntBusinessLimit": 32.0,
            "WeightSystemDomEconomyFee": 5.0,
            "WeightSystemIntEconomyFee": 8.0,
            "PieceSystemIntEconomyFee": 50.0,
            "currency": "₺",
            "InternationalCurrency": "$",
        }))
        .unwrap();

        let mut store = MemoryReferenceStore::default();
        store.insert_airline(crate::domain::model::Airline::from_record(record, "turkish"));
        store.insert_country(Country {
            id: "turkey".to_string(),
            name: "Turkey".to_string(),
            uses_piece_system: false,
        });
        store.insert_country(Country {
            id: "germany".to_string(),
            name: "Germany".to_string(),
            uses_piece_system: false,
        });
        store.insert_country(Country {
            id: "united-states".to_string(),
            name: "United States".to_string(),
            uses_piece_system: true,
        });
        store
    }

    fn selection(flight_type: FlightType, destination: &str) -> Selection {
        Selection {
            airline: "turkish".to_string(),
            class_type: CabinClass::Economy,
            flight_type,
            trip: TripDirection::Outbound,
            origin: "turkey".to_string(),
            destination: destination.to_string(),
        }
    }

    fn items(weights_and_counts: &[(f64, u32)]) -> Vec<SelectedItem> {
        weights_and_counts
            .iter()
            .enumerate()
            .map(|(i, (weight, count))| SelectedItem {
                item_id: format!("item-{}", i),
                name: format!("Item {}", i),
                unit_weight: *weight,
                count: *count,
            })
            .collect()
    }

    #[tokio::test]
    async fn no_violation_reports_distance_to_limit() {
        let engine = CalculationEngine::new(reference(), MemoryHistoryStore::default());
        let outcome = engine
            .run(
                &selection(FlightType::Domestic, "turkey"),
                &items(&[(0.5, 2), (1.2, 1)]),
            )
            .await
            .unwrap();

        assert!(!outcome.limit_exceeded);
        assert_eq!(outcome.fee, 0.0);
        assert_eq!(
            outcome.summary,
            "Your total weight is 2.2 kilograms. You are 20.8 kilograms away from passing the airline policy."
        );
        assert_eq!(
            outcome.fee_detail,
            "You do not pay a fine since you did not exceed any policies. Good job!"
        );
    }

    #[tokio::test]
    async fn violation_computes_weight_system_fee() {
        let engine = CalculationEngine::new(reference(), MemoryHistoryStore::default());
        let outcome = engine
            .run(
                &selection(FlightType::Domestic, "turkey"),
                &items(&[(25.0, 1)]),
            )
            .await
            .unwrap();

        assert!(outcome.limit_exceeded);
        assert_eq!(outcome.system, AccountingSystem::Weight);
        assert_eq!(outcome.fee, 10.0);
        assert_eq!(outcome.currency, "₺");
        assert!(outcome
            .summary
            .contains("You exceed the airline policy by 2.0 kilograms"));
    }

    #[tokio::test]
    async fn piece_itinerary_charges_flat_international_fee() {
        let engine = CalculationEngine::new(reference(), MemoryHistoryStore::default());
        let outcome = engine
            .run(
                &selection(FlightType::International, "united-states"),
                &items(&[(40.0, 1)]),
            )
            .await
            .unwrap();

        assert_eq!(outcome.system, AccountingSystem::Piece);
        assert_eq!(outcome.fee, 50.0);
        assert_eq!(outcome.currency, "$");

        let lighter = engine
            .run(
                &selection(FlightType::International, "united-states"),
                &items(&[(25.0, 1)]),
            )
            .await
            .unwrap();
        assert_eq!(lighter.fee, outcome.fee);
    }

    #[tokio::test]
    async fn not_offered_combination_names_the_selection() {
        let engine = CalculationEngine::new(reference(), MemoryHistoryStore::default());
        let mut sel = selection(FlightType::International, "germany");
        sel.class_type = CabinClass::First;

        let err = engine.run(&sel, &items(&[(10.0, 1)])).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Turkish Airlines does not offer first class for international flights"
        );

        // nothing is logged for a combination that is not offered
        assert!(engine.history().records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_airline_aborts_without_guessing() {
        let engine = CalculationEngine::new(reference(), MemoryHistoryStore::default());
        let mut sel = selection(FlightType::International, "germany");
        sel.airline = "emirates".to_string();

        let err = engine.run(&sel, &items(&[(10.0, 1)])).await.unwrap_err();
        assert!(matches!(err, CalcError::ReferenceDataMissingError { .. }));
    }

    #[tokio::test]
    async fn run_is_deterministic_for_fixed_inputs() {
        let engine = CalculationEngine::new(reference(), MemoryHistoryStore::default());
        let sel = selection(FlightType::International, "germany");
        let bag = items(&[(12.5, 2), (0.3, 4)]);

        let first = engine.run(&sel, &bag).await.unwrap();
        let second = engine.run(&sel, &bag).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn logging_records_items_and_tracks_usage() {
        let history = MemoryHistoryStore::default();
        let engine = CalculationEngine::new(reference(), history);
        let now = Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 15).unwrap();
        let bag = vec![
            SelectedItem {
                item_id: "laptop".to_string(),
                name: "Laptop".to_string(),
                unit_weight: 1.5,
                count: 1,
            },
            SelectedItem {
                item_id: "tshirt".to_string(),
                name: "T-Shirt".to_string(),
                unit_weight: 0.2,
                count: 0,
            },
        ];

        engine
            .run_at(&selection(FlightType::International, "germany"), &bag, now)
            .await
            .unwrap();

        let records = engine.history().records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin, "Turkey");
        assert_eq!(records[0].destination, "Germany");
        assert_eq!(records[0].items_used.len(), 1);
        assert_eq!(records[0].items_used[0].name, "Laptop");

        let usage = engine.history().item_usage().await.unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].0, "Laptop");
        assert_eq!(usage[0].1.times_used, 1);

        // 第二次計算要累計，不是覆蓋
        engine
            .run_at(&selection(FlightType::International, "germany"), &bag, now)
            .await
            .unwrap();
        let usage = engine.history().item_usage().await.unwrap();
        assert_eq!(usage[0].1.times_used, 2);
    }
}
