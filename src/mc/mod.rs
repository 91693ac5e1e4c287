//! Scalar Monte Carlo backend.

pub mod simulation;

pub use simulation::{GbmPathGenerator, ScalarRun, ScalarSimulationEngine};
