//! Common Types Module
//!
//! Shared value types for the spread calculator: a single time-series
//! observation and the sampling-resolution tag used to size the rolling
//! window.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single (timestamp, value) observation in a price series.
///
/// Immutable after construction. Equality and hashing cover the full pair,
/// so two observations at the same instant with different values are
/// distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSeriesElement {
    /// The observation instant (UTC).
    pub timestamp: DateTime<Utc>,
    /// The observed value, typically a close price.
    pub value: Decimal,
}

impl TimeSeriesElement {
    pub fn new(timestamp: DateTime<Utc>, value: Decimal) -> Self {
        Self { timestamp, value }
    }
}

impl fmt::Display for TimeSeriesElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateTime: {}, Value: {}", self.timestamp, self.value)
    }
}

/// Sampling granularity of a time series.
///
/// `Other` is a catch-all for feeds whose granularity is not one of the
/// standard levels; it carries no window multiplier and cannot be used to
/// size a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionLevel {
    Tick,
    Second,
    Minute,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Other,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown resolution code: {0}")]
pub struct ParseResolutionError(String);

impl ResolutionLevel {
    /// Scale factor applied to a daily-unit window count to approximate the
    /// same calendar span at this granularity. `None` for [`Other`].
    ///
    /// [`Other`]: ResolutionLevel::Other
    pub fn window_multiplier(self) -> Option<u64> {
        match self {
            ResolutionLevel::Daily => Some(1),
            ResolutionLevel::Weekly => Some(7),
            ResolutionLevel::Monthly => Some(30),
            ResolutionLevel::Hourly => Some(24),
            ResolutionLevel::Minute => Some(24 * 60),
            ResolutionLevel::Second => Some(24 * 60 * 60),
            ResolutionLevel::Tick => Some(24 * 60 * 60 * 1000),
            ResolutionLevel::Other => None,
        }
    }

    /// Short wire code for this level ("h" for hourly, "wk" for weekly, ...).
    pub fn code(self) -> &'static str {
        match self {
            ResolutionLevel::Tick => "t",
            ResolutionLevel::Second => "s",
            ResolutionLevel::Minute => "min",
            ResolutionLevel::Hourly => "h",
            ResolutionLevel::Daily => "d",
            ResolutionLevel::Weekly => "wk",
            ResolutionLevel::Monthly => "mo",
            ResolutionLevel::Other => "other",
        }
    }
}

impl fmt::Display for ResolutionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ResolutionLevel {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "t" => Ok(ResolutionLevel::Tick),
            "s" => Ok(ResolutionLevel::Second),
            "min" => Ok(ResolutionLevel::Minute),
            "h" => Ok(ResolutionLevel::Hourly),
            "d" => Ok(ResolutionLevel::Daily),
            "wk" => Ok(ResolutionLevel::Weekly),
            "mo" => Ok(ResolutionLevel::Monthly),
            "other" => Ok(ResolutionLevel::Other),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}
