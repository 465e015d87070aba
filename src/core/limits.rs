use crate::core::system::SystemResolution;
use crate::domain::model::{Airline, CabinClass, FlightType};
use crate::utils::error::{CalcError, Result};

/// Looks up the checked-luggage allowance for a `(class, flight type)`
/// pair. An absent entry means the airline does not sell that combination,
/// which surfaces as `NotOfferedError` naming the exact combination.
pub fn resolve_limit(
    airline: &Airline,
    class_type: CabinClass,
    flight_type: FlightType,
) -> Result<f64> {
    airline
        .limits
        .get(class_type, flight_type)
        .ok_or_else(|| CalcError::NotOfferedError {
            airline: airline.name.clone(),
            class_type,
            flight_type,
        })
}

/// What the presentation layer may offer for the current airline and
/// country pair. The engine itself never enforces these, it stays
/// tolerant of selections that slip past the gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightOptions {
    pub domestic_enabled: bool,
    pub first_class_offered: bool,
    /// Country both dropdowns should be pinned to for a domestic flight.
    pub pinned_domestic_country: Option<String>,
}

/// Domestic is offered only when the airline flies domestic AND no piece
/// system is active for the chosen countries (piece itineraries are always
/// treated as international). Pass `None` while countries are unset.
pub fn flight_options(airline: &Airline, resolution: Option<&SystemResolution>) -> FlightOptions {
    let piece_active = resolution
        .map(|r| r.origin_uses_piece || r.destination_uses_piece)
        .unwrap_or(false);

    let domestic_enabled = airline.supports_domestic && !piece_active;

    FlightOptions {
        domestic_enabled,
        first_class_offered: airline.supports_first_class,
        pinned_domestic_country: if domestic_enabled {
            airline.domestic_home_country.clone()
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::system::resolve_system;
    use crate::domain::model::{AirlineRecord, Country};

    fn airline(first_class: bool, domestic: bool) -> Airline {
        let record: AirlineRecord = serde_json::from_value(serde_json::json!({
            "name": "Turkish Airlines",
            "DomesticFlights": domestic,
            "FirstClass": first_class,
            "DomCountry": "turkey",
            "DomEconomyLimit": 15.0,
            "IntEconomyLimit": 23.0,
            "IntBusinessLimit": 32.0,
        }))
        .unwrap();
        Airline::from_record(record, "turkish")
    }

    fn country(id: &str, uses_piece: bool) -> Country {
        Country {
            id: id.to_string(),
            name: id.to_string(),
            uses_piece_system: uses_piece,
        }
    }

    #[test]
    fn resolves_configured_limit() {
        let airline = airline(false, true);
        let limit =
            resolve_limit(&airline, CabinClass::Economy, FlightType::International).unwrap();
        assert_eq!(limit, 23.0);
    }

    #[test]
    fn unconfigured_combination_is_not_offered() {
        let airline = airline(false, true);
        let err =
            resolve_limit(&airline, CabinClass::First, FlightType::International).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Turkish Airlines does not offer first class for international flights"
        );
    }

    #[test]
    fn domestic_gated_by_airline_capability() {
        let no_domestic = airline(false, false);
        let options = flight_options(&no_domestic, None);
        assert!(!options.domestic_enabled);
        assert_eq!(options.pinned_domestic_country, None);

        let with_domestic = airline(false, true);
        let options = flight_options(&with_domestic, None);
        assert!(options.domestic_enabled);
        assert_eq!(options.pinned_domestic_country.as_deref(), Some("turkey"));
    }

    #[test]
    fn domestic_gated_by_active_piece_system() {
        let with_domestic = airline(false, true);
        let resolution = resolve_system(&country("usa", true), &country("turkey", false));
        let options = flight_options(&with_domestic, Some(&resolution));
        assert!(!options.domestic_enabled);

        let resolution = resolve_system(&country("germany", false), &country("turkey", false));
        let options = flight_options(&with_domestic, Some(&resolution));
        assert!(options.domestic_enabled);
    }

    #[test]
    fn first_class_follows_airline_capability() {
        assert!(flight_options(&airline(true, true), None).first_class_offered);
        assert!(!flight_options(&airline(false, true), None).first_class_offered);
    }
}
