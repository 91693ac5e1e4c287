//! Core parameter, result and error types shared by every backend.

pub mod error;
pub mod params;
pub mod results;

pub use error::{Result, SimulationError};
pub use params::{DT, SimulationParameters, SimulationParametersBuilder, TRADING_DAYS};
pub use results::{FinalPriceBuffer, PathResult, TerminalSummary};
