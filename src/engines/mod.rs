//! Simulation engine implementations.

pub mod gpu;
