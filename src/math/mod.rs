//! Mathematical utilities for trading strategies.
//!
//! This module provides statistical primitives used by the spread
//! calculator, including ordinary-least-squares fitting for hedge ratio
//! estimation.

pub mod ols;

pub use ols::{LinearFit, OlsRegression, RegressionBackend, RegressionError};
