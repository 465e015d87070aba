pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::dataset::Dataset;
pub use config::CliConfig;
pub use core::engine::CalculationEngine;
pub use utils::error::{CalcError, Result};
