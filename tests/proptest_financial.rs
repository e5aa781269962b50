//! Property-based tests for financial calculations
//!
//! These tests use proptest to verify invariants across many random inputs,
//! catching edge cases that unit tests might miss.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use pairspread::math::{OlsRegression, RegressionBackend};
use pairspread::strategy::PairDiffCalculator;
use pairspread::types::{ResolutionLevel, TimeSeriesElement};

fn daily_ts(day: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(day * 86_400, 0).unwrap()
}

/// Sample variance of a slice, used to skip degenerate explanatory inputs.
fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

proptest! {
    /// The fit is finite whenever the inputs are finite and non-degenerate.
    #[test]
    fn fit_is_finite_for_valid_input(
        xs in prop::collection::vec(-1000.0f64..1000.0f64, 10..100),
        ys in prop::collection::vec(-1000.0f64..1000.0f64, 10..100)
    ) {
        let n = xs.len().min(ys.len());
        let (xs, ys) = (&xs[..n], &ys[..n]);
        prop_assume!(variance(xs) > 1e-9);

        let fit = OlsRegression.fit(ys, xs).unwrap();
        prop_assert!(fit.slope.is_finite(), "slope should be finite: {}", fit.slope);
        prop_assert!(fit.intercept.is_finite(), "intercept should be finite: {}", fit.intercept);
    }

    /// Noiseless linear data is recovered exactly (up to float rounding).
    #[test]
    fn fit_recovers_noiseless_line(
        slope in -5.0f64..5.0f64,
        intercept in -100.0f64..100.0f64,
        xs in prop::collection::vec(-500.0f64..500.0f64, 10..50)
    ) {
        prop_assume!(variance(&xs) > 1e-6);
        let ys: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();

        let fit = OlsRegression.fit(&ys, &xs).unwrap();
        prop_assert!(
            (fit.slope - slope).abs() < 1e-6 * (1.0 + slope.abs()),
            "slope {} should recover {}", fit.slope, slope
        );
        prop_assert!(
            (fit.intercept - intercept).abs() < 1e-4 * (1.0 + intercept.abs()),
            "intercept {} should recover {}", fit.intercept, intercept
        );
    }

    /// Reordering the sample (consistently on both sides) leaves the
    /// coefficients unchanged.
    #[test]
    fn fit_is_order_invariant(
        xs in prop::collection::vec(-500.0f64..500.0f64, 10..50),
        ys in prop::collection::vec(-500.0f64..500.0f64, 10..50)
    ) {
        let n = xs.len().min(ys.len());
        let (xs, ys) = (&xs[..n], &ys[..n]);
        prop_assume!(variance(xs) > 1e-9);

        let forward = OlsRegression.fit(ys, xs).unwrap();
        let xs_rev: Vec<f64> = xs.iter().rev().copied().collect();
        let ys_rev: Vec<f64> = ys.iter().rev().copied().collect();
        let backward = OlsRegression.fit(&ys_rev, &xs_rev).unwrap();

        prop_assert!(
            (forward.slope - backward.slope).abs() < 1e-6 * (1.0 + forward.slope.abs()),
            "slopes diverge: {} vs {}", forward.slope, backward.slope
        );
        prop_assert!(
            (forward.intercept - backward.intercept).abs() < 1e-4 * (1.0 + forward.intercept.abs()),
            "intercepts diverge: {} vs {}", forward.intercept, backward.intercept
        );
    }

    /// OLS with an intercept leaves residuals with (near) zero mean.
    #[test]
    fn fit_residuals_have_zero_mean(
        xs in prop::collection::vec(-500.0f64..500.0f64, 10..50),
        ys in prop::collection::vec(-500.0f64..500.0f64, 10..50)
    ) {
        let n = xs.len().min(ys.len());
        let (xs, ys) = (&xs[..n], &ys[..n]);
        prop_assume!(variance(xs) > 1e-9);

        let fit = OlsRegression.fit(ys, xs).unwrap();
        let mean_residual: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| fit.residual(*x, *y))
            .sum::<f64>()
            / n as f64;
        let scale = 1.0 + ys.iter().map(|y| y.abs()).fold(0.0, f64::max);
        prop_assert!(
            mean_residual.abs() < 1e-9 * scale,
            "mean residual should vanish: {}", mean_residual
        );
    }

    /// The diff of a pair that sits exactly on a line is (near) zero,
    /// whatever the window contents.
    #[test]
    fn diff_vanishes_on_exact_linear_pair(
        slope in 0.5f64..3.0f64,
        intercept in -50.0f64..50.0f64,
        values in prop::collection::vec(50.0f64..150.0f64, 5..30)
    ) {
        prop_assume!(variance(&values) > 1e-6);

        let series_b: Vec<TimeSeriesElement> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                TimeSeriesElement::new(daily_ts(i as i64), Decimal::from_f64(*v).unwrap())
            })
            .collect();
        let series_a: Vec<TimeSeriesElement> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                TimeSeriesElement::new(
                    daily_ts(i as i64),
                    Decimal::from_f64(slope * v + intercept).unwrap(),
                )
            })
            .collect();

        let mut calculator = PairDiffCalculator::with_window_base(
            "A",
            "B",
            ResolutionLevel::Daily,
            values.len() as u64,
            Box::new(OlsRegression),
        )
        .unwrap();
        calculator.update_time_series(&series_a, &series_b).unwrap();

        let diff = calculator.calculate_diff(None).unwrap();
        let scale = 1.0 + intercept.abs() + 150.0 * slope.abs();
        prop_assert!(
            diff.abs() < 1e-6 * scale,
            "residual should vanish on a perfect line: {}", diff
        );
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_variance_of_constant_is_zero() {
        assert_eq!(variance(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_fit_on_two_points_is_exact() {
        // Two points define the line exactly.
        let fit = OlsRegression.fit(&[3.0, 5.0], &[1.0, 2.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
    }
}
