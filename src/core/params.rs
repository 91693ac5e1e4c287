//! Immutable simulation inputs shared by the scalar and parallel backends.

use serde::Deserialize;

use crate::core::{Result, SimulationError};

/// Number of trading days per year; every step advances time by `1 / TRADING_DAYS`.
pub const TRADING_DAYS: f64 = 252.0;

/// Fixed time-step fraction applied by both backends.
pub const DT: f64 = 1.0 / TRADING_DAYS;

/// Inputs to one Monte Carlo run under geometric Brownian motion.
///
/// Values are validated once at construction; engines may rely on
/// `days >= 1`, `path_count >= 1`, `entry_price > 0` and `volatility >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    entry_price: f64,
    average_return: f64,
    volatility: f64,
    days: usize,
    path_count: usize,
}

impl SimulationParameters {
    /// Validates and builds a parameter set.
    ///
    /// # Examples
    /// ```
    /// use gbmsim::core::SimulationParameters;
    ///
    /// let params = SimulationParameters::new(100.0, 0.1, 0.2, 252, 10_000).unwrap();
    /// assert_eq!(params.days(), 252);
    /// assert!(SimulationParameters::new(100.0, 0.1, 0.2, 0, 10).is_err());
    /// ```
    pub fn new(
        entry_price: f64,
        average_return: f64,
        volatility: f64,
        days: usize,
        path_count: usize,
    ) -> Result<Self> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(SimulationError::InvalidParameters(format!(
                "entry price must be finite and > 0, got {entry_price}"
            )));
        }
        if !average_return.is_finite() {
            return Err(SimulationError::InvalidParameters(format!(
                "average return must be finite, got {average_return}"
            )));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(SimulationError::InvalidParameters(format!(
                "volatility must be finite and >= 0, got {volatility}"
            )));
        }
        if days < 1 {
            return Err(SimulationError::InvalidParameters(
                "days must be >= 1".to_string(),
            ));
        }
        if path_count < 1 {
            return Err(SimulationError::InvalidParameters(
                "path count must be >= 1".to_string(),
            ));
        }

        Ok(Self {
            entry_price,
            average_return,
            volatility,
            days,
            path_count,
        })
    }

    /// Starts a parameter builder seeded with the defaults.
    ///
    /// # Examples
    /// ```
    /// use gbmsim::core::SimulationParameters;
    ///
    /// let params = SimulationParameters::builder()
    ///     .volatility(0.35)
    ///     .path_count(1_000)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(params.entry_price(), 100.0);
    /// assert_eq!(params.path_count(), 1_000);
    /// ```
    #[inline]
    pub fn builder() -> SimulationParametersBuilder {
        SimulationParametersBuilder::default()
    }

    /// Returns a copy with a different path count, keeping every other field.
    pub fn with_path_count(&self, path_count: usize) -> Result<Self> {
        Self::new(
            self.entry_price,
            self.average_return,
            self.volatility,
            self.days,
            path_count,
        )
    }

    #[inline]
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    #[inline]
    pub fn average_return(&self) -> f64 {
        self.average_return
    }

    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    #[inline]
    pub fn days(&self) -> usize {
        self.days
    }

    #[inline]
    pub fn path_count(&self) -> usize {
        self.path_count
    }

    /// Time step in years.
    #[inline]
    pub fn dt(&self) -> f64 {
        DT
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            entry_price: 100.0,
            average_return: 0.1,
            volatility: 0.2,
            days: 252,
            path_count: 10_000,
        }
    }
}

/// Builder for [`SimulationParameters`]; unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationParametersBuilder {
    entry_price: Option<f64>,
    average_return: Option<f64>,
    volatility: Option<f64>,
    days: Option<usize>,
    path_count: Option<usize>,
}

impl SimulationParametersBuilder {
    #[inline]
    pub fn entry_price(mut self, entry_price: f64) -> Self {
        self.entry_price = Some(entry_price);
        self
    }

    #[inline]
    pub fn average_return(mut self, average_return: f64) -> Self {
        self.average_return = Some(average_return);
        self
    }

    #[inline]
    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    #[inline]
    pub fn days(mut self, days: usize) -> Self {
        self.days = Some(days);
        self
    }

    #[inline]
    pub fn path_count(mut self, path_count: usize) -> Self {
        self.path_count = Some(path_count);
        self
    }

    /// Fills unset fields from the defaults and validates the result.
    pub fn build(self) -> Result<SimulationParameters> {
        let defaults = SimulationParameters::default();
        SimulationParameters::new(
            self.entry_price.unwrap_or(defaults.entry_price),
            self.average_return.unwrap_or(defaults.average_return),
            self.volatility.unwrap_or(defaults.volatility),
            self.days.unwrap_or(defaults.days),
            self.path_count.unwrap_or(defaults.path_count),
        )
    }
}
