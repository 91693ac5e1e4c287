//! Module `mc::simulation`.
//!
//! Sequential scalar backend: one geometric Brownian motion path at a time,
//! every step retained.
//!
//! Each step applies the exact log-normal update
//! `S_{t+1} = S_t * exp((mu - sigma^2 / 2) dt + sigma sqrt(dt) Z)` with `Z`
//! drawn by Box-Muller from either a seeded xoshiro256++ stream or the
//! thread-local generator.
//!
//! This backend is the performance baseline for [`crate::bench`]; it is
//! deliberately single-threaded and blocking.
use std::time::Instant;

use tracing::debug;

use crate::core::{PathResult, Result, SimulationError, SimulationParameters};
use crate::math::{FastRng, box_muller_normal};

/// Writes one log-normal GBM path into `out`, one price per element.
#[derive(Debug, Clone, Copy)]
pub struct GbmPathGenerator {
    drift: f64,
    diffusion: f64,
    s0: f64,
}

impl GbmPathGenerator {
    pub fn new(params: &SimulationParameters) -> Self {
        let dt = params.dt();
        let sigma = params.volatility();
        Self {
            drift: (params.average_return() - 0.5 * sigma * sigma) * dt,
            diffusion: sigma * dt.sqrt(),
            s0: params.entry_price(),
        }
    }

    /// Fills `out` by drawing one normal per step from `rng`.
    #[inline]
    pub fn generate_into(&self, rng: &mut FastRng, out: &mut [f64]) {
        let mut s = self.s0;
        for slot in out.iter_mut() {
            let z = box_muller_normal(rng);
            s *= self.diffusion.mul_add(z, self.drift).exp();
            *slot = s;
        }
    }

    /// Same update driven by caller-supplied normals; `out.len()` steps are written.
    pub fn generate_from_normals(&self, normals: &[f64], out: &mut [f64]) {
        let mut s = self.s0;
        for (slot, &z) in out.iter_mut().zip(normals) {
            s *= self.diffusion.mul_add(z, self.drift).exp();
            *slot = s;
        }
    }
}

/// Output of one scalar run.
#[derive(Debug, Clone)]
pub struct ScalarRun {
    pub paths: PathResult,
    /// Wall-clock time of the path loop only, in milliseconds.
    pub elapsed_ms: f64,
}

/// Sequential CPU simulation engine.
#[derive(Debug, Clone, Default)]
pub struct ScalarSimulationEngine {
    pub seed: Option<u64>,
}

impl ScalarSimulationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the random stream so repeated runs return identical paths.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Draws from the thread-local generator on every run.
    pub fn with_thread_rng(mut self) -> Self {
        self.seed = None;
        self
    }

    /// Simulates `path_count` paths of `days` steps each.
    pub fn run(&self, params: &SimulationParameters) -> Result<ScalarRun> {
        let path_count = params.path_count();
        let days = params.days();
        if path_count.checked_mul(days).is_none() {
            return Err(SimulationError::InvalidParameters(format!(
                "{path_count} paths of {days} days do not fit in host memory"
            )));
        }
        let generator = GbmPathGenerator::new(params);
        let mut rng = FastRng::from_optional_seed(self.seed);
        let mut paths = PathResult::zeroed(path_count, days);

        let start = Instant::now();
        for i in 0..path_count {
            generator.generate_into(&mut rng, paths.path_mut(i));
        }
        let elapsed_ms = start.elapsed().as_secs_f64() * 1.0e3;

        debug!(
            path_count,
            days,
            elapsed_ms,
            seeded = self.seed.is_some(),
            "scalar simulation finished"
        );

        Ok(ScalarRun { paths, elapsed_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_normals_follow_deterministic_drift() {
        let params = SimulationParameters::new(100.0, 0.1, 0.2, 252, 1).unwrap();
        let generator = GbmPathGenerator::new(&params);
        let normals = vec![0.0; 252];
        let mut out = vec![0.0; 252];
        generator.generate_from_normals(&normals, &mut out);

        let expected = 100.0 * ((0.1 - 0.5 * 0.04) * 1.0_f64).exp();
        assert_relative_eq!(out[251], expected, max_relative = 1e-10);
        assert!(out.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn zero_volatility_ignores_the_sampler() {
        let params = SimulationParameters::new(80.0, 0.05, 0.0, 10, 3).unwrap();
        let run = ScalarSimulationEngine::new().run(&params).unwrap();
        let expected = 80.0 * (0.05 * 10.0 / 252.0_f64).exp();
        for path in run.paths.iter() {
            assert_relative_eq!(path[9], expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn seeded_runs_are_identical() {
        let params = SimulationParameters::new(100.0, 0.1, 0.2, 20, 50).unwrap();
        let engine = ScalarSimulationEngine::new().with_seed(42);
        let a = engine.run(&params).unwrap();
        let b = engine.run(&params).unwrap();
        assert_eq!(a.paths, b.paths);
    }

    #[test]
    fn different_seeds_diverge() {
        let params = SimulationParameters::new(100.0, 0.1, 0.2, 20, 5).unwrap();
        let a = ScalarSimulationEngine::new().with_seed(1).run(&params).unwrap();
        let b = ScalarSimulationEngine::new().with_seed(2).run(&params).unwrap();
        assert_ne!(a.paths, b.paths);
    }

    #[test]
    fn single_path_single_day() {
        let params = SimulationParameters::new(100.0, 0.1, 0.2, 1, 1).unwrap();
        let run = ScalarSimulationEngine::new().run(&params).unwrap();
        assert_eq!(run.paths.path_count(), 1);
        assert_eq!(run.paths.days(), 1);
        let price = run.paths.path(0).unwrap()[0];
        assert!(price.is_finite() && price > 0.0);
        assert!(run.elapsed_ms >= 0.0);
    }

    #[test]
    fn oversized_trajectory_grid_is_rejected() {
        let params = SimulationParameters::new(100.0, 0.1, 0.2, usize::MAX / 2 + 1, 2).unwrap();
        let err = ScalarSimulationEngine::new().with_seed(1).run(&params).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidParameters(_)), "{err}");
    }

    #[test]
    fn terminal_mean_matches_lognormal_expectation() {
        let params = SimulationParameters::new(100.0, 0.1, 0.2, 252, 20_000).unwrap();
        let run = ScalarSimulationEngine::new().with_seed(11).run(&params).unwrap();
        let summary = run.paths.summary();
        // E[S_T] = S_0 e^{mu T}; standard error of the mean is about 0.16 here.
        let expected = 100.0 * 0.1_f64.exp();
        assert!(
            (summary.mean - expected).abs() < 1.0,
            "mean={} expected={expected}",
            summary.mean
        );
    }
}
