//! Result containers returned by the two backends.
//!
//! The scalar backend keeps every step of every path; the parallel backend
//! keeps only the terminal price of each lane. Both expose the same
//! [`TerminalSummary`] so callers can compare distributions without caring
//! which backend produced them.

/// Full trajectories from the scalar backend, stored path-major in one allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    days: usize,
    values: Vec<f64>,
}

impl PathResult {
    /// Allocates a zeroed result for `path_count` paths of `days` steps.
    pub(crate) fn zeroed(path_count: usize, days: usize) -> Self {
        Self {
            days,
            values: vec![0.0; path_count * days],
        }
    }

    /// Mutable view of one path, used by the engine to fill it in place.
    #[inline]
    pub(crate) fn path_mut(&mut self, index: usize) -> &mut [f64] {
        let start = index * self.days;
        &mut self.values[start..start + self.days]
    }

    /// Number of simulated paths.
    #[inline]
    pub fn path_count(&self) -> usize {
        if self.days == 0 {
            0
        } else {
            self.values.len() / self.days
        }
    }

    /// Number of steps in every path.
    #[inline]
    pub fn days(&self) -> usize {
        self.days
    }

    /// Prices of path `index`, one per day, or `None` when out of range.
    pub fn path(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.days)?;
        self.values.get(start..start + self.days)
    }

    /// Iterates paths in simulation order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.days.max(1))
    }

    /// Last price of every path.
    pub fn terminal_prices(&self) -> Vec<f64> {
        self.iter().filter_map(|path| path.last().copied()).collect()
    }

    /// Summary statistics of the terminal prices.
    pub fn summary(&self) -> TerminalSummary {
        TerminalSummary::from_prices(self.iter().filter_map(|path| path.last().copied()))
    }
}

/// Terminal prices from the parallel backend, one `f32` per lane.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalPriceBuffer {
    prices: Vec<f32>,
}

impl FinalPriceBuffer {
    pub(crate) fn from_vec(prices: Vec<f32>) -> Self {
        Self { prices }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.prices
    }

    pub fn summary(&self) -> TerminalSummary {
        TerminalSummary::from_prices(self.prices.iter().map(|&p| p as f64))
    }
}

impl AsRef<[f32]> for FinalPriceBuffer {
    fn as_ref(&self) -> &[f32] {
        &self.prices
    }
}

/// Distribution summary of terminal prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalSummary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl TerminalSummary {
    /// Single-pass Welford accumulation; an empty input yields NaN moments.
    pub fn from_prices<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut mean = 0.0_f64;
        let mut m2 = 0.0_f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for x in prices {
            count += 1;
            let delta = x - mean;
            mean += delta / count as f64;
            m2 += delta * (x - mean);
            min = min.min(x);
            max = max.max(x);
        }

        if count == 0 {
            return Self {
                count,
                mean: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }

        let std_dev = if count > 1 {
            (m2 / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Self {
            count,
            mean,
            std_dev,
            min,
            max,
        }
    }
}
