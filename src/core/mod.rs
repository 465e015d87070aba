pub mod analytics;
pub mod engine;
pub mod fees;
pub mod limits;
pub mod system;
pub mod weight;

pub use crate::domain::model::{
    AccountingSystem, CabinClass, CalculationOutcome, CalculationRecord, FlightType,
    SelectedItem, Selection, SelectionDraft, TripDirection,
};
pub use crate::domain::ports::{CatalogStore, HistoryStore, ReferenceStore};
pub use crate::utils::error::Result;
