//! Short-horizon forecasts over the trailing seven observations of a series.
//!
//! All values are rounded to one decimal. With `is_precipitation` set, negative values are
//! clamped to 0 after rounding; temperatures are never clamped. An empty series forecasts 0.

use crate::utils::round1;
use chrono::NaiveDate;
use rand::Rng;
use std::fmt;

/// Number of most recent observations every strategy looks at.
pub const TRAILING_WINDOW: usize = 7;
/// Half-width of the uniform offset added by [`perturbed_forecast`].
pub const PERTURBATION: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastStrategy {
    Mean,
    #[default]
    Trend,
    Perturbed,
}

impl ForecastStrategy {
    pub const ALL: [ForecastStrategy; 3] = [
        ForecastStrategy::Mean,
        ForecastStrategy::Trend,
        ForecastStrategy::Perturbed,
    ];

    /// Runs this strategy over `series`, which must be in date order.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        series: &[f64],
        horizon: usize,
        is_precipitation: bool,
        rng: &mut R,
    ) -> Vec<f64> {
        match self {
            ForecastStrategy::Mean => mean_forecast(series, horizon, is_precipitation),
            ForecastStrategy::Trend => trend_forecast(series, horizon, is_precipitation),
            ForecastStrategy::Perturbed => {
                perturbed_forecast(series, horizon, is_precipitation, rng)
            }
        }
    }
}

impl fmt::Display for ForecastStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ForecastStrategy::Mean => "mean",
            ForecastStrategy::Trend => "trend",
            ForecastStrategy::Perturbed => "perturbed",
        };
        write!(f, "{label}")
    }
}

/// Temperature and precipitation forecasts for the days after a reference date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Forecast {
    pub days: Vec<NaiveDate>,
    pub temperature: Vec<f64>,
    pub precipitation: Vec<f64>,
}

impl Forecast {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

fn trailing(series: &[f64]) -> &[f64] {
    &series[series.len().saturating_sub(TRAILING_WINDOW)..]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn finish(value: f64, is_precipitation: bool) -> f64 {
    let value = round1(value);
    if is_precipitation && value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Repeats the trailing mean for every forecast day.
pub fn mean_forecast(series: &[f64], horizon: usize, is_precipitation: bool) -> Vec<f64> {
    let value = finish(mean(trailing(series)), is_precipitation);
    vec![value; horizon]
}

/// Extends a least-squares line through the trailing values.
///
/// With trailing values at x = 0..n, the forecast for day `i` (1-based) is the line evaluated
/// at `n + i`. Fewer than two values fall back to [`mean_forecast`].
pub fn trend_forecast(series: &[f64], horizon: usize, is_precipitation: bool) -> Vec<f64> {
    let window = trailing(series);
    if window.len() < 2 {
        return mean_forecast(series, horizon, is_precipitation);
    }

    let n = window.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(window);
    let (covariance, variance) = window
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (x, y)| {
            let dx = x as f64 - x_mean;
            (cov + dx * (y - y_mean), var + dx * dx)
        });
    let slope = covariance / variance;
    let intercept = y_mean - slope * x_mean;

    (1..=horizon)
        .map(|i| finish(intercept + slope * (n + i as f64), is_precipitation))
        .collect()
}

/// The trailing mean plus an independent uniform offset in `[-3, 3]` per day.
pub fn perturbed_forecast<R: Rng + ?Sized>(
    series: &[f64],
    horizon: usize,
    is_precipitation: bool,
    rng: &mut R,
) -> Vec<f64> {
    let base = mean(trailing(series));
    (0..horizon)
        .map(|_| {
            let offset = rng.random_range(-PERTURBATION..=PERTURBATION);
            finish(base + offset, is_precipitation)
        })
        .collect()
}
