use crate::domain::model::{AccountingSystem, Country};

/// Which accounting system governs an itinerary, with the per-side flags
/// kept so callers can tell the traveler which country triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemResolution {
    pub system: AccountingSystem,
    pub origin_uses_piece: bool,
    pub destination_uses_piece: bool,
}

/// The piece regime governs when it applies to either leg; weight only
/// when both sides bill per kilogram. Flight type plays no part here.
pub fn resolve_system(origin: &Country, destination: &Country) -> SystemResolution {
    let origin_uses_piece = origin.uses_piece_system;
    let destination_uses_piece = destination.uses_piece_system;

    let system = if origin_uses_piece || destination_uses_piece {
        AccountingSystem::Piece
    } else {
        AccountingSystem::Weight
    };

    SystemResolution {
        system,
        origin_uses_piece,
        destination_uses_piece,
    }
}

/// Advisory text for the traveler when the piece system is in play,
/// naming the side(s) that use it. `None` when both countries bill per
/// kilogram.
pub fn piece_system_notice(origin: &Country, destination: &Country) -> Option<String> {
    const EXPLANATION: &str = "the piece system instead of the weight system, \
which charges for each piece of overweight luggage instead of per kilogram.";

    match (origin.uses_piece_system, destination.uses_piece_system) {
        (true, true) => Some(format!(
            "{} and {} use {}",
            origin.name, destination.name, EXPLANATION
        )),
        (true, false) => Some(format!("{} uses {}", origin.name, EXPLANATION)),
        (false, true) => Some(format!("{} uses {}", destination.name, EXPLANATION)),
        (false, false) => None,
    }
}
