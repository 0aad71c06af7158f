use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ForecastResult;
use crate::methods;

/// A forecasting method applied to one series at a time.
///
/// Implementations must be stateless between calls: the same descriptor is
/// broadcast to every partition and used concurrently.
pub trait ForecastModel: Send + Sync + 'static {
    /// Output column name for this model.
    fn alias(&self) -> String;

    /// Fit on `input` and predict `h` steps ahead.
    fn forecast(&self, input: &SeriesInput<'_>, h: usize) -> ForecastResult<Vec<f64>>;
}

/// Exogenous regressors, row-major and aligned with a series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Regressors {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Regressors {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { names, rows }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Regressors {
        Regressors {
            names: self.names.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }
}

/// History handed to a model.
#[derive(Debug, Clone, Copy)]
pub struct SeriesInput<'a> {
    pub y: &'a [f64],
    pub history: Option<&'a Regressors>,
    pub future: Option<&'a Regressors>,
}

impl<'a> SeriesInput<'a> {
    pub fn new(y: &'a [f64]) -> Self {
        Self {
            y,
            history: None,
            future: None,
        }
    }

    pub fn with_regressors(mut self, history: &'a Regressors, future: &'a Regressors) -> Self {
        self.history = Some(history);
        self.future = Some(future);
        self
    }
}

/// Built-in methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelKind {
    Naive,
    SeasonalNaive { season_length: usize },
    HistoricAverage,
    WindowAverage { window_size: usize },
    SeasonalWindowAverage { season_length: usize, window_size: usize },
    RandomWalkWithDrift,
    SimpleExponentialSmoothing { alpha: f64 },
    ExogenousRegression,
}

impl ModelKind {
    /// Default column name.
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Naive => "Naive",
            ModelKind::SeasonalNaive { .. } => "SeasonalNaive",
            ModelKind::HistoricAverage => "HistoricAverage",
            ModelKind::WindowAverage { .. } => "WindowAverage",
            ModelKind::SeasonalWindowAverage { .. } => "SeasonalWindowAverage",
            ModelKind::RandomWalkWithDrift => "RWD",
            ModelKind::SimpleExponentialSmoothing { .. } => "SES",
            ModelKind::ExogenousRegression => "ExogenousRegression",
        }
    }
}

/// Serializable model descriptor: a method plus an optional column alias.
///
/// This is what gets broadcast to workers, so it carries everything needed to
/// rebuild the model on the other side and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(flatten)]
    kind: ModelKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
}

impl ModelSpec {
    pub fn new(kind: ModelKind) -> Self {
        Self { kind, alias: None }
    }

    pub fn naive() -> Self {
        Self::new(ModelKind::Naive)
    }

    pub fn seasonal_naive(season_length: usize) -> Self {
        Self::new(ModelKind::SeasonalNaive { season_length })
    }

    pub fn historic_average() -> Self {
        Self::new(ModelKind::HistoricAverage)
    }

    pub fn window_average(window_size: usize) -> Self {
        Self::new(ModelKind::WindowAverage { window_size })
    }

    pub fn seasonal_window_average(season_length: usize, window_size: usize) -> Self {
        Self::new(ModelKind::SeasonalWindowAverage {
            season_length,
            window_size,
        })
    }

    pub fn random_walk_with_drift() -> Self {
        Self::new(ModelKind::RandomWalkWithDrift)
    }

    pub fn ses(alpha: f64) -> Self {
        Self::new(ModelKind::SimpleExponentialSmoothing { alpha })
    }

    pub fn exogenous_regression() -> Self {
        Self::new(ModelKind::ExogenousRegression)
    }

    /// Override the output column name.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => f.write_str(alias),
            None => f.write_str(self.kind.name()),
        }
    }
}

impl ForecastModel for ModelSpec {
    fn alias(&self) -> String {
        self.to_string()
    }

    fn forecast(&self, input: &SeriesInput<'_>, h: usize) -> ForecastResult<Vec<f64>> {
        let y = input.y;
        match &self.kind {
            ModelKind::Naive => methods::naive(y, h),
            ModelKind::SeasonalNaive { season_length } => {
                methods::seasonal_naive(y, h, *season_length)
            }
            ModelKind::HistoricAverage => methods::historic_average(y, h),
            ModelKind::WindowAverage { window_size } => methods::window_average(y, h, *window_size),
            ModelKind::SeasonalWindowAverage {
                season_length,
                window_size,
            } => methods::seasonal_window_average(y, h, *season_length, *window_size),
            ModelKind::RandomWalkWithDrift => methods::random_walk_with_drift(y, h),
            ModelKind::SimpleExponentialSmoothing { alpha } => {
                methods::simple_exponential_smoothing(y, h, *alpha)
            }
            ModelKind::ExogenousRegression => {
                methods::exogenous_regression(y, h, input.history, input.future)
            }
        }
    }
}
