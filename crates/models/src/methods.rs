//! Baseline forecasting methods.
//!
//! Each function takes a finite, chronologically ordered history and returns
//! exactly `h` point forecasts.

use linregress::{FormulaRegressionBuilder, RegressionDataBuilder};

use crate::error::{ForecastError, ForecastResult};
use crate::model::Regressors;

fn require(name: &str, y: &[f64], needed: usize) -> ForecastResult<()> {
    if y.len() < needed {
        return Err(ForecastError::insufficient(format!("`{name}`"), needed, y.len()));
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Repeat the last observation.
pub fn naive(y: &[f64], h: usize) -> ForecastResult<Vec<f64>> {
    require("Naive", y, 1)?;
    Ok(vec![y[y.len() - 1]; h])
}

/// Repeat the last observed season.
pub fn seasonal_naive(y: &[f64], h: usize, season_length: usize) -> ForecastResult<Vec<f64>> {
    if season_length == 0 {
        return Err(ForecastError::invalid_input("season_length must be positive"));
    }
    require("SeasonalNaive", y, season_length)?;
    let last_season = &y[y.len() - season_length..];
    Ok((0..h).map(|i| last_season[i % season_length]).collect())
}

/// Mean of the whole history.
pub fn historic_average(y: &[f64], h: usize) -> ForecastResult<Vec<f64>> {
    require("HistoricAverage", y, 1)?;
    Ok(vec![mean(y); h])
}

/// Mean of the last `window_size` observations.
pub fn window_average(y: &[f64], h: usize, window_size: usize) -> ForecastResult<Vec<f64>> {
    if window_size == 0 {
        return Err(ForecastError::invalid_input("window_size must be positive"));
    }
    require("WindowAverage", y, window_size)?;
    Ok(vec![mean(&y[y.len() - window_size..]); h])
}

/// Per season position, the mean over the last `window_size` seasons.
pub fn seasonal_window_average(
    y: &[f64],
    h: usize,
    season_length: usize,
    window_size: usize,
) -> ForecastResult<Vec<f64>> {
    if season_length == 0 || window_size == 0 {
        return Err(ForecastError::invalid_input(
            "season_length and window_size must be positive",
        ));
    }
    require("SeasonalWindowAverage", y, season_length * window_size)?;
    let tail = &y[y.len() - season_length * window_size..];
    let profile: Vec<f64> = (0..season_length)
        .map(|pos| {
            let total: f64 = (0..window_size).map(|w| tail[w * season_length + pos]).sum();
            total / window_size as f64
        })
        .collect();
    Ok((0..h).map(|i| profile[i % season_length]).collect())
}

/// Last value plus the average historical step.
pub fn random_walk_with_drift(y: &[f64], h: usize) -> ForecastResult<Vec<f64>> {
    require("RWD", y, 2)?;
    let n = y.len();
    let last = y[n - 1];
    let drift = (last - y[0]) / (n - 1) as f64;
    Ok((1..=h).map(|i| last + drift * i as f64).collect())
}

/// Simple exponential smoothing with a fixed smoothing weight.
pub fn simple_exponential_smoothing(y: &[f64], h: usize, alpha: f64) -> ForecastResult<Vec<f64>> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(ForecastError::invalid_input(format!(
            "alpha must be in (0, 1], got {alpha}"
        )));
    }
    require("SES", y, 1)?;
    let level = y[1..]
        .iter()
        .fold(y[0], |level, &obs| alpha * obs + (1.0 - alpha) * level);
    Ok(vec![level; h])
}

/// Ordinary least squares of the target on future-known regressors plus an intercept.
pub fn exogenous_regression(
    y: &[f64],
    h: usize,
    history: Option<&Regressors>,
    future: Option<&Regressors>,
) -> ForecastResult<Vec<f64>> {
    let (Some(history), Some(future)) = (history, future) else {
        return Err(ForecastError::exogenous(
            "ExogenousRegression needs historical and future regressors",
        ));
    };
    if history.names() != future.names() {
        return Err(ForecastError::exogenous(format!(
            "regressor columns differ: history {:?}, future {:?}",
            history.names(),
            future.names()
        )));
    }
    if history.len() != y.len() || future.len() != h {
        return Err(ForecastError::exogenous(format!(
            "expected {} historical and {h} future regressor rows, got {} and {}",
            y.len(),
            history.len(),
            future.len()
        )));
    }
    require("ExogenousRegression", y, history.width() + 1)?;

    let beta = fit_ols(y, history)?;
    Ok(future
        .rows()
        .iter()
        .map(|row| beta[0] + row.iter().zip(&beta[1..]).map(|(x, b)| x * b).sum::<f64>())
        .collect())
}

/// Intercept followed by one coefficient per regressor column.
fn fit_ols(y: &[f64], history: &Regressors) -> ForecastResult<Vec<f64>> {
    let failed = |e: linregress::Error| ForecastError::model_failed("ExogenousRegression", e.to_string());

    // Regressor names are user column names; the formula uses positional ones.
    let inputs: Vec<String> = (0..history.width()).map(|i| format!("x{i}")).collect();
    let mut columns = vec![("y".to_string(), y.to_vec())];
    for (i, name) in inputs.iter().enumerate() {
        columns.push((name.clone(), history.rows().iter().map(|row| row[i]).collect()));
    }

    let data = RegressionDataBuilder::new().build_from(columns).map_err(failed)?;
    let beta = FormulaRegressionBuilder::new()
        .data(&data)
        .formula(format!("y ~ {}", inputs.join(" + ")))
        .fit_without_statistics()
        .map_err(failed)?;
    if beta.len() != inputs.len() + 1 || beta.iter().any(|b| !b.is_finite()) {
        return Err(ForecastError::model_failed(
            "ExogenousRegression",
            "regression produced no usable coefficients",
        ));
    }
    Ok(beta)
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn averages_stay_within_the_observed_range(
            y in prop::collection::vec(-1.0e6f64..1.0e6, 1..40),
            h in 1usize..10,
        ) {
            let lo = y.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let tol = 1e-6 * (1.0 + lo.abs().max(hi.abs()));
            for forecast in [
                historic_average(&y, h).unwrap(),
                window_average(&y, h, y.len()).unwrap(),
                simple_exponential_smoothing(&y, h, 0.5).unwrap(),
            ] {
                prop_assert_eq!(forecast.len(), h);
                for v in forecast {
                    prop_assert!(v >= lo - tol && v <= hi + tol);
                }
            }
        }

        #[test]
        fn naive_repeats_the_last_observation(
            y in prop::collection::vec(-1.0e3f64..1.0e3, 1..20),
            h in 1usize..10,
        ) {
            let last = *y.last().unwrap();
            prop_assert_eq!(naive(&y, h).unwrap(), vec![last; h]);
        }
    }
}
