//! `gbmsim` simulates asset-price paths under geometric Brownian motion on two
//! independent backends and compares their wall-clock performance.
//!
//! - [`mc`]: sequential scalar backend. Exact log-normal steps with Box-Muller
//!   normals; every step of every path is kept.
//! - [`engines::gpu`]: wgpu compute backend. One lane per path, 64 lanes per
//!   workgroup, a stateless hash as the per-step sampler and a linearised
//!   update; only terminal prices are read back.
//! - [`bench`]: runs both backends over a list of path counts and reports the
//!   speedup, recording per-size failures without aborting the run.
//!
//! The backends use different samplers and update rules and are compared on
//! timing only, never on bit-equality of their output.
//!
//! # Quick Start
//! ```rust
//! use gbmsim::core::SimulationParameters;
//! use gbmsim::mc::ScalarSimulationEngine;
//!
//! let params = SimulationParameters::new(100.0, 0.1, 0.2, 252, 100).unwrap();
//! let run = ScalarSimulationEngine::new().with_seed(42).run(&params).unwrap();
//!
//! assert_eq!(run.paths.path_count(), 100);
//! assert!(run.paths.iter().all(|path| path.len() == 252));
//! ```
//!
//! The parallel backend needs a device:
//! ```no_run
//! use gbmsim::core::SimulationParameters;
//! use gbmsim::engines::gpu::{GpuContext, GpuOptions, ParallelSimulationEngine};
//!
//! let mut ctx = GpuContext::new_blocking(&GpuOptions::default()).unwrap();
//! let params = SimulationParameters::default();
//! let run = ParallelSimulationEngine::new().run_blocking(&mut ctx, &params).unwrap();
//! assert_eq!(run.prices.len(), 10_000);
//! ```

pub mod bench;
pub mod config;
pub mod core;
pub mod engines;
pub mod math;
pub mod mc;

pub use crate::bench::{BenchmarkRecord, BenchmarkReport, BenchmarkRunner};
pub use crate::core::{
    FinalPriceBuffer, PathResult, Result, SimulationError, SimulationParameters,
};
pub use crate::engines::gpu::{GpuContext, GpuOptions, ParallelSimulationEngine};
pub use crate::mc::ScalarSimulationEngine;
