//! Fixed-Length-Window Pair Trading Spread Calculator
//!
//! Estimates the hedge relationship between two aligned price series by OLS
//! regression over a trailing window, then measures the residual of the most
//! recent observation against the fitted line:
//!
//! ```text
//! diff = A_latest - (a * B_latest + c)
//! ```
//!
//! The residual is the classic mean-reversion signal for a pairs trade:
//! fitting the whole window rather than just the two latest points keeps the
//! hedge-ratio estimate stable against short-term noise.
//!
//! ## Windowing
//! The window length is fixed at construction: a daily-unit base count
//! (default 183, roughly a trading half-year) scaled by the resolution's
//! multiplier. History is kept in full in timestamp-ordered maps, so the
//! diff can be recomputed as of any historical cutoff; the window is the
//! most recent `window_length` observations at or before the cutoff, newest
//! first.
//!
//! ## Storage identity
//! Each series maps timestamp to latest value: inserting at an existing
//! timestamp overwrites. Duplicate timestamps inside a regression window
//! would otherwise carry conflicting values for the same instant.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::math::{LinearFit, OlsRegression, RegressionBackend, RegressionError};
use crate::types::{ResolutionLevel, TimeSeriesElement};

/// Default window count in daily units, roughly a trading half-year.
pub const DEFAULT_WINDOW_BASE: u64 = 183;

#[derive(Error, Debug)]
pub enum PairDiffError {
    #[error("unsupported resolution level: {0}")]
    UnsupportedResolution(ResolutionLevel),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("misaligned input: {0}")]
    MisalignedInput(String),
    #[error("data source not ready, load history with update_time_series() first")]
    NotInitialized,
    #[error("insufficient data: expected {expected} points at or before the cutoff, got {actual}")]
    InsufficientData { expected: usize, actual: usize },
    #[error("regression failed: {0}")]
    Regression(#[from] RegressionError),
}

/// Result of one windowed fit: the coefficients plus the newest value of
/// each window.
struct WindowFit {
    fit: LinearFit,
    latest_a: f64,
    latest_b: f64,
}

/// Stateful spread calculator for one symbol pair at one resolution.
///
/// Owns the two observation series, maintains their alignment invariant
/// (equal cardinality, pairwise-shared timestamps), and orchestrates window
/// selection and regression into a diff value or an equation string.
///
/// Not internally synchronized: callers needing concurrent access must
/// serialize all calls.
pub struct PairDiffCalculator {
    symbol1: String,
    symbol2: String,
    resolution: ResolutionLevel,
    window_length: usize,
    series1: BTreeMap<DateTime<Utc>, Decimal>,
    series2: BTreeMap<DateTime<Utc>, Decimal>,
    regression: Box<dyn RegressionBackend>,
}

impl std::fmt::Debug for PairDiffCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairDiffCalculator")
            .field("symbol1", &self.symbol1)
            .field("symbol2", &self.symbol2)
            .field("resolution", &self.resolution)
            .field("window_length", &self.window_length)
            .field("series1", &self.series1)
            .field("series2", &self.series2)
            .field("regression", &"<dyn RegressionBackend>")
            .finish()
    }
}

impl PairDiffCalculator {
    /// Create a calculator with the default OLS backend and window base.
    pub fn new(
        symbol1: impl Into<String>,
        symbol2: impl Into<String>,
        resolution: ResolutionLevel,
    ) -> Result<Self, PairDiffError> {
        Self::with_regression(symbol1, symbol2, resolution, Box::new(OlsRegression))
    }

    /// Create a calculator with a custom regression backend.
    pub fn with_regression(
        symbol1: impl Into<String>,
        symbol2: impl Into<String>,
        resolution: ResolutionLevel,
        regression: Box<dyn RegressionBackend>,
    ) -> Result<Self, PairDiffError> {
        Self::with_window_base(symbol1, symbol2, resolution, DEFAULT_WINDOW_BASE, regression)
    }

    /// Create a calculator with an explicit daily-unit window base count.
    ///
    /// The window length is `base_count * resolution multiplier`, derived
    /// here once and fixed for the calculator's lifetime.
    pub fn with_window_base(
        symbol1: impl Into<String>,
        symbol2: impl Into<String>,
        resolution: ResolutionLevel,
        base_count: u64,
        regression: Box<dyn RegressionBackend>,
    ) -> Result<Self, PairDiffError> {
        if base_count == 0 {
            return Err(PairDiffError::InvalidConfig(
                "window base count must be positive".to_string(),
            ));
        }
        let multiplier = resolution
            .window_multiplier()
            .ok_or(PairDiffError::UnsupportedResolution(resolution))?;
        let window_length = (base_count * multiplier) as usize;

        let symbol1 = symbol1.into();
        let symbol2 = symbol2.into();
        info!(
            symbol1 = %symbol1,
            symbol2 = %symbol2,
            resolution = %resolution,
            window_length,
            "Pair diff calculator created"
        );

        Ok(Self {
            symbol1,
            symbol2,
            resolution,
            window_length,
            series1: BTreeMap::new(),
            series2: BTreeMap::new(),
            regression,
        })
    }

    pub fn symbol1(&self) -> &str {
        &self.symbol1
    }

    pub fn symbol2(&self) -> &str {
        &self.symbol2
    }

    pub fn resolution(&self) -> ResolutionLevel {
        self.resolution
    }

    /// Number of observations the regression window must hold.
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Stored observation count per series.
    pub fn observation_count(&self) -> usize {
        self.series1.len()
    }

    /// Readiness gate: both series hold data and their cardinalities agree.
    pub fn is_ready(&self) -> bool {
        !self.series1.is_empty() && self.series1.len() == self.series2.len()
    }

    /// Replace both series wholesale with the given aligned histories.
    ///
    /// The inputs must have equal length and pairwise-identical timestamps;
    /// a rejected batch leaves prior state untouched. Duplicate timestamps
    /// within a batch collapse, last value wins.
    pub fn update_time_series(
        &mut self,
        series1: &[TimeSeriesElement],
        series2: &[TimeSeriesElement],
    ) -> Result<(), PairDiffError> {
        if series1.len() != series2.len() {
            return Err(PairDiffError::MisalignedInput(format!(
                "series lengths differ: {} vs {}",
                series1.len(),
                series2.len()
            )));
        }
        for (index, (elm1, elm2)) in series1.iter().zip(series2).enumerate() {
            if elm1.timestamp != elm2.timestamp {
                return Err(PairDiffError::MisalignedInput(format!(
                    "timestamp mismatch at index {}: {} vs {}",
                    index, elm1.timestamp, elm2.timestamp
                )));
            }
        }

        self.series1 = series1.iter().map(|e| (e.timestamp, e.value)).collect();
        self.series2 = series2.iter().map(|e| (e.timestamp, e.value)).collect();

        if self.series1.len() != series1.len() {
            warn!(
                input = series1.len(),
                stored = self.series1.len(),
                "Duplicate timestamps collapsed, last value wins"
            );
        }
        info!(
            symbol1 = %self.symbol1,
            symbol2 = %self.symbol2,
            points = self.series1.len(),
            "Time series replaced"
        );
        Ok(())
    }

    /// Append one aligned observation pair.
    ///
    /// Requires a successful bulk load first. Inserting at an existing
    /// timestamp overwrites that observation on both legs.
    pub fn update_time_series_element(
        &mut self,
        elm1: TimeSeriesElement,
        elm2: TimeSeriesElement,
    ) -> Result<(), PairDiffError> {
        if !self.is_ready() {
            return Err(PairDiffError::NotInitialized);
        }
        if elm1.timestamp != elm2.timestamp {
            return Err(PairDiffError::MisalignedInput(format!(
                "element timestamps differ: {} vs {}",
                elm1.timestamp, elm2.timestamp
            )));
        }

        let replaced = self.series1.insert(elm1.timestamp, elm1.value).is_some();
        self.series2.insert(elm2.timestamp, elm2.value);
        if replaced {
            debug!(timestamp = %elm1.timestamp, "Overwrote existing observation pair");
        } else {
            debug!(timestamp = %elm1.timestamp, "Appended observation pair");
        }
        Ok(())
    }

    /// Spread residual of the most recent observation against the hedge
    /// line fitted over the trailing window.
    ///
    /// With no cutoff the latest stored timestamp is used; an explicit
    /// cutoff recomputes the diff as of that instant.
    #[instrument(skip(self))]
    pub fn calculate_diff(&self, end: Option<DateTime<Utc>>) -> Result<f64, PairDiffError> {
        let window = self.fit_window(end)?;
        let diff = window.fit.residual(window.latest_b, window.latest_a);
        debug!(diff, "Spread residual calculated");
        Ok(diff)
    }

    /// The fitted relationship as display text, coefficients to four
    /// decimals: `diff = <symbol1> - (<a> * <symbol2> + <c>)`.
    pub fn equation(&self, end: Option<DateTime<Utc>>) -> Result<String, PairDiffError> {
        let window = self.fit_window(end)?;
        Ok(format!(
            "diff = {} - ({:.4} * {} + {:.4})",
            self.symbol1, window.fit.slope, self.symbol2, window.fit.intercept
        ))
    }

    /// Select both trailing windows as of the cutoff and fit the hedge line.
    fn fit_window(&self, end: Option<DateTime<Utc>>) -> Result<WindowFit, PairDiffError> {
        if !self.is_ready() {
            return Err(PairDiffError::NotInitialized);
        }
        let cutoff = end
            .or_else(|| self.series1.keys().next_back().copied())
            .ok_or(PairDiffError::NotInitialized)?;

        let window_a = Self::window_values(&self.series1, cutoff, self.window_length);
        let window_b = Self::window_values(&self.series2, cutoff, self.window_length);
        if window_a.len() < self.window_length || window_b.len() < self.window_length {
            return Err(PairDiffError::InsufficientData {
                expected: self.window_length,
                actual: window_a.len().min(window_b.len()),
            });
        }

        let fit = self.regression.fit(&window_a, &window_b)?;
        debug!(
            slope = fit.slope,
            intercept = fit.intercept,
            window = self.window_length,
            cutoff = %cutoff,
            "Hedge line fitted"
        );

        // Windows are newest-first, so index 0 is the latest observation.
        Ok(WindowFit {
            fit,
            latest_a: window_a[0],
            latest_b: window_b[0],
        })
    }

    /// Values at or before `cutoff`, newest first, at most `limit` entries.
    ///
    /// A value that cannot be represented as f64 surfaces as NaN and is
    /// rejected by the regression's non-finite guard.
    fn window_values(
        series: &BTreeMap<DateTime<Utc>, Decimal>,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Vec<f64> {
        series
            .range(..=cutoff)
            .rev()
            .take(limit)
            .map(|(_, value)| value.to_f64().unwrap_or(f64::NAN))
            .collect()
    }
}
