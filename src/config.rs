//! TOML configuration for the CLI and embedding applications.
//!
//! Every section and field is optional; missing values take the defaults.
//! Unknown sections or keys are rejected. `[gpu] seed` is accepted as an
//! alias of `salt`.
//!
//! ```toml
//! [parameters]
//! entry_price = 100.0
//! average_return = 0.1
//! volatility = 0.2
//! days = 252
//! path_count = 10000
//!
//! [scalar]
//! seed = 42
//!
//! [gpu]
//! power_preference = "high-performance"
//! map_timeout_ms = 5000
//! salt = 0
//!
//! [benchmark]
//! sizes = [1000, 10000]
//!
//! [render]
//! price_divisor = 200.0
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::bench::{BenchmarkRunner, DEFAULT_SIZES};
use crate::core::{Result, SimulationError, SimulationParameters, SimulationParametersBuilder};
use crate::engines::gpu::{
    DEFAULT_PRICE_DIVISOR, GpuOptions, ParallelSimulationEngine, PowerPreference,
};
use crate::mc::ScalarSimulationEngine;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub parameters: SimulationParametersBuilder,
    pub scalar: ScalarConfig,
    pub gpu: GpuConfig,
    pub benchmark: BenchmarkConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScalarConfig {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuConfig {
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
    pub map_timeout_ms: Option<u64>,
    /// Per-run kernel salt.
    #[serde(alias = "seed")]
    pub salt: u32,
}

impl GpuConfig {
    /// Device acquisition options described by this section.
    pub fn options(&self) -> GpuOptions {
        GpuOptions {
            power_preference: self.power_preference,
            force_fallback_adapter: self.force_fallback_adapter,
            map_timeout_ms: self.map_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub sizes: Vec<usize>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub price_divisor: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            price_divisor: DEFAULT_PRICE_DIVISOR,
        }
    }
}

impl SimulationConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SimulationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Loads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        self.parameters()?;
        if !(self.render.price_divisor.is_finite() && self.render.price_divisor > 0.0) {
            return Err(SimulationError::Config(format!(
                "render.price_divisor must be finite and > 0, got {}",
                self.render.price_divisor
            )));
        }
        Ok(())
    }

    pub fn parameters(&self) -> Result<SimulationParameters> {
        self.parameters.clone().build()
    }

    pub fn scalar_engine(&self) -> ScalarSimulationEngine {
        ScalarSimulationEngine {
            seed: self.scalar.seed,
        }
    }

    pub fn parallel_engine(&self) -> ParallelSimulationEngine {
        ParallelSimulationEngine::new().with_salt(self.gpu.salt)
    }

    pub fn benchmark_runner(&self) -> Result<BenchmarkRunner> {
        Ok(BenchmarkRunner::new(self.parameters()?)
            .with_scalar(self.scalar_engine())
            .with_parallel(self.parallel_engine()))
    }
}
