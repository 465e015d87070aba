use crate::domain::model::{AccountingSystem, Airline, CabinClass, FlightType};

/// Kilograms billed for a weight-system violation. Partial kilograms
/// always round up, in the traveler's disfavor.
pub fn billable_units(total_weight: f64, limit: f64) -> f64 {
    (total_weight - limit).ceil()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeBreakdown {
    pub fee: f64,
    pub currency: String,
    pub detail: String,
}

/// Computes the excess fee for a violation (`total_weight > limit`).
///
/// Non-violations never reach this function; the engine composes the
/// fee-free branch itself.
pub fn compute_fee(
    system: AccountingSystem,
    class_type: CabinClass,
    flight_type: FlightType,
    airline: &Airline,
    total_weight: f64,
    limit: f64,
) -> FeeBreakdown {
    match system {
        AccountingSystem::Piece => {
            // 固定費率，與超重多少無關；piece 一律查國際費率表
            let fee = airline.piece_fees.per_piece(class_type);
            let currency = airline.international_currency.clone();
            let detail = format!(
                "According to the airline policy, you have to pay {}{} for a piece of extra luggage for your excess weight.",
                fee, currency
            );
            FeeBreakdown {
                fee,
                currency,
                detail,
            }
        }
        AccountingSystem::Weight => {
            let per_kilogram = airline.weight_fees.per_kilogram(class_type, flight_type);
            let fee = billable_units(total_weight, limit) * per_kilogram;
            let currency = airline.currency_for(flight_type).to_string();
            let detail = format!(
                "According to the airline policy, you have to pay {}{} per kilogram. Which amounts to a total of {}{}.",
                per_kilogram, currency, fee, currency
            );
            FeeBreakdown {
                fee,
                currency,
                detail,
            }
        }
    }
}
