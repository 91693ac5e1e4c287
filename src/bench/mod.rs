//! Scalar-versus-parallel timing comparison over a list of path counts.
//!
//! Engines run one after the other for every size, never concurrently, so
//! neither timing includes contention from the other. A failure at one size
//! is recorded and the remaining sizes still run.

use std::fmt;

use tracing::{info, warn};

use crate::core::{SimulationError, SimulationParameters};
use crate::engines::gpu::{GpuContext, ParallelSimulationEngine};
use crate::mc::ScalarSimulationEngine;

/// Path counts benchmarked when none are configured.
pub const DEFAULT_SIZES: [usize; 2] = [1_000, 10_000];

/// Timings for one path count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkRecord {
    pub path_count: usize,
    pub scalar_time_ms: f64,
    pub parallel_time_ms: f64,
    /// `scalar_time_ms / parallel_time_ms`; above 1 means the parallel backend was faster.
    pub speedup_ratio: f64,
}

impl BenchmarkRecord {
    pub fn new(path_count: usize, scalar_time_ms: f64, parallel_time_ms: f64) -> Self {
        Self {
            path_count,
            scalar_time_ms,
            parallel_time_ms,
            speedup_ratio: speedup(scalar_time_ms, parallel_time_ms),
        }
    }
}

/// Which engine a failed size died in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkStage {
    Parameters,
    Scalar,
    Parallel,
}

impl fmt::Display for BenchmarkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameters => write!(f, "parameters"),
            Self::Scalar => write!(f, "scalar"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// Result for one requested size.
#[derive(Debug, Clone, PartialEq)]
pub enum BenchmarkOutcome {
    Completed(BenchmarkRecord),
    Failed {
        path_count: usize,
        stage: BenchmarkStage,
        error: SimulationError,
    },
}

impl BenchmarkOutcome {
    pub fn path_count(&self) -> usize {
        match self {
            Self::Completed(record) => record.path_count,
            Self::Failed { path_count, .. } => *path_count,
        }
    }
}

/// Ordered outcomes, one per requested size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkReport {
    pub outcomes: Vec<BenchmarkOutcome>,
}

impl BenchmarkReport {
    /// Completed records in request order.
    pub fn records(&self) -> Vec<BenchmarkRecord> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                BenchmarkOutcome::Completed(record) => Some(*record),
                BenchmarkOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// `(path_count, error)` for every size that failed.
    pub fn failures(&self) -> Vec<(usize, &SimulationError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                BenchmarkOutcome::Failed {
                    path_count, error, ..
                } => Some((*path_count, error)),
                BenchmarkOutcome::Completed(_) => None,
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o, BenchmarkOutcome::Completed(_)))
    }
}

/// Runs both engines over a list of sizes with every other parameter held fixed.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRunner {
    pub base: SimulationParameters,
    pub scalar: ScalarSimulationEngine,
    pub parallel: ParallelSimulationEngine,
}

impl BenchmarkRunner {
    pub fn new(base: SimulationParameters) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn with_scalar(mut self, scalar: ScalarSimulationEngine) -> Self {
        self.scalar = scalar;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelSimulationEngine) -> Self {
        self.parallel = parallel;
        self
    }

    pub async fn run(&self, ctx: &mut GpuContext, sizes: &[usize]) -> BenchmarkReport {
        let mut outcomes = Vec::with_capacity(sizes.len());
        for &path_count in sizes {
            let outcome = self.run_size(ctx, path_count).await;
            match &outcome {
                BenchmarkOutcome::Completed(record) => info!(
                    path_count,
                    scalar_ms = record.scalar_time_ms,
                    parallel_ms = record.parallel_time_ms,
                    speedup = record.speedup_ratio,
                    "benchmark size completed"
                ),
                BenchmarkOutcome::Failed { stage, error, .. } => warn!(
                    path_count,
                    %stage,
                    %error,
                    "benchmark size failed"
                ),
            }
            outcomes.push(outcome);
        }
        BenchmarkReport { outcomes }
    }

    pub fn run_blocking(&self, ctx: &mut GpuContext, sizes: &[usize]) -> BenchmarkReport {
        pollster::block_on(self.run(ctx, sizes))
    }

    async fn run_size(&self, ctx: &mut GpuContext, path_count: usize) -> BenchmarkOutcome {
        let failed = |stage, error| BenchmarkOutcome::Failed {
            path_count,
            stage,
            error,
        };

        let params = match self.base.with_path_count(path_count) {
            Ok(params) => params,
            Err(error) => return failed(BenchmarkStage::Parameters, error),
        };
        let scalar = match self.scalar.run(&params) {
            Ok(run) => run,
            Err(error) => return failed(BenchmarkStage::Scalar, error),
        };
        // Release the trajectories before timing the device.
        let scalar_time_ms = scalar.elapsed_ms;
        drop(scalar);

        match self.parallel.run(ctx, &params).await {
            Ok(run) => BenchmarkOutcome::Completed(BenchmarkRecord::new(
                path_count,
                scalar_time_ms,
                run.elapsed_ms,
            )),
            Err(error) => failed(BenchmarkStage::Parallel, error),
        }
    }
}

/// Ratio of scalar to parallel time, kept positive and finite for sub-resolution timings.
pub fn speedup(scalar_time_ms: f64, parallel_time_ms: f64) -> f64 {
    const FLOOR_MS: f64 = 1.0e-6;
    scalar_time_ms.max(FLOOR_MS) / parallel_time_ms.max(FLOOR_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn record_computes_speedup() {
        let record = BenchmarkRecord::new(1_000, 120.0, 8.0);
        assert_relative_eq!(record.speedup_ratio, 15.0);
    }

    #[test]
    fn speedup_stays_positive_for_zero_timings() {
        assert!(speedup(0.0, 0.0) > 0.0);
        assert!(speedup(5.0, 0.0).is_finite());
    }

    #[test]
    fn report_splits_records_and_failures_in_order() {
        let report = BenchmarkReport {
            outcomes: vec![
                BenchmarkOutcome::Completed(BenchmarkRecord::new(10, 2.0, 1.0)),
                BenchmarkOutcome::Failed {
                    path_count: 0,
                    stage: BenchmarkStage::Parameters,
                    error: SimulationError::InvalidParameters("path count must be >= 1".into()),
                },
                BenchmarkOutcome::Completed(BenchmarkRecord::new(20, 4.0, 1.0)),
            ],
        };

        let records = report.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path_count, 10);
        assert_eq!(records[1].path_count, 20);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].0, 0);
        assert!(!report.is_complete());
        assert_eq!(report.outcomes[1].path_count(), 0);
    }
}
