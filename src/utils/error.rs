use crate::domain::model::{CabinClass, FlightType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Dataset parse error: {0}")]
    DatasetError(#[from] toml::de::Error),

    #[error("Selection is missing required fields: {missing}")]
    IncompleteSelectionError { missing: String },

    #[error("No items with a positive count have been added")]
    EmptySelectionError,

    #[error("{airline} does not offer {class_type} class for {flight_type} flights")]
    NotOfferedError {
        airline: String,
        class_type: CabinClass,
        flight_type: FlightType,
    },

    #[error("No {kind} record found for id '{id}'")]
    ReferenceDataMissingError { kind: String, id: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidRecordError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingFieldError { field: String },

    #[error("Traversal cancelled before completion")]
    CancelledError,
}

pub type Result<T> = std::result::Result<T, CalcError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Selection,
    Reference,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CalcError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CalcError::IncompleteSelectionError { .. }
            | CalcError::EmptySelectionError
            | CalcError::NotOfferedError { .. } => ErrorCategory::Selection,
            CalcError::ReferenceDataMissingError { .. } => ErrorCategory::Reference,
            CalcError::InvalidRecordError { .. }
            | CalcError::MissingFieldError { .. }
            | CalcError::DatasetError(_)
            | CalcError::SerializationError(_) => ErrorCategory::Data,
            CalcError::HttpError(_) | CalcError::IoError(_) | CalcError::CancelledError => {
                ErrorCategory::System
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 有效但不支援的組合，照常結束
            CalcError::NotOfferedError { .. } | CalcError::CancelledError => ErrorSeverity::Low,
            CalcError::IncompleteSelectionError { .. } | CalcError::EmptySelectionError => {
                ErrorSeverity::Medium
            }
            CalcError::ReferenceDataMissingError { .. }
            | CalcError::InvalidRecordError { .. }
            | CalcError::MissingFieldError { .. }
            | CalcError::DatasetError(_) => ErrorSeverity::High,
            CalcError::HttpError(_) | CalcError::IoError(_) | CalcError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CalcError::IncompleteSelectionError { .. } => {
                "Please fill in information regarding flight and luggage before attempting to calculate.".to_string()
            }
            CalcError::EmptySelectionError => {
                "Please add at least one item before calculating.".to_string()
            }
            CalcError::NotOfferedError { .. } => self.to_string(),
            CalcError::ReferenceDataMissingError { kind, id } => {
                format!("Could not find the selected {} ('{}') in the reference data.", kind, id)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            CalcError::IncompleteSelectionError { missing } => {
                format!("Set the missing fields ({}) and try again", missing)
            }
            CalcError::EmptySelectionError => {
                "Add at least one item with a count above zero".to_string()
            }
            CalcError::NotOfferedError { .. } => {
                "Please select a different class or flight type".to_string()
            }
            CalcError::ReferenceDataMissingError { kind, .. } => {
                format!("Check that the {} id matches the reference dataset", kind)
            }
            CalcError::InvalidRecordError { field, .. } | CalcError::MissingFieldError { field } => {
                format!("Fix the '{}' field in the reference dataset", field)
            }
            CalcError::DatasetError(_) => "Check the dataset file syntax".to_string(),
            CalcError::HttpError(_) => "Check the store endpoint and network connection".to_string(),
            CalcError::IoError(_) => "Check file paths and permissions".to_string(),
            CalcError::SerializationError(_) => "Check the stored history records".to_string(),
            CalcError::CancelledError => "Re-run the traversal when the view is active".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_offered_message_names_the_combination() {
        let err = CalcError::NotOfferedError {
            airline: "Qatar Airways".to_string(),
            class_type: CabinClass::First,
            flight_type: FlightType::Domestic,
        };
        assert_eq!(
            err.to_string(),
            "Qatar Airways does not offer first class for domestic flights"
        );
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.category(), ErrorCategory::Selection);
    }

    #[test]
    fn selection_errors_are_medium_severity() {
        assert_eq!(
            CalcError::EmptySelectionError.severity(),
            ErrorSeverity::Medium
        );
        let err = CalcError::IncompleteSelectionError {
            missing: "airline, origin".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.recovery_suggestion().contains("airline, origin"));
    }

    #[test]
    fn reference_data_missing_is_high_severity() {
        let err = CalcError::ReferenceDataMissingError {
            kind: "airline".to_string(),
            id: "emirates".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.to_string(), "No airline record found for id 'emirates'");
    }
}
