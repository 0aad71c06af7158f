//! The single-machine forecasting component.
//!
//! [`SeriesForecaster`] fits every model on every series of a frame, one series
//! after another on the calling thread. It never spawns work of its own: callers
//! that want parallelism split the frame by entity and run one forecaster per
//! split.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use shardcast_core::{
    DType, Field, ForecastArgs, Frame, Freq, KeyValue, Row, Schema, Value, CUTOFF_COL, ID_COL,
    TARGET_COL, TIME_COL,
};

use crate::error::{ForecastError, ForecastResult};
use crate::model::{ForecastModel, ModelSpec, Regressors, SeriesInput};

/// Fits a fixed list of models on each series of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesForecaster<M = ModelSpec> {
    models: Vec<M>,
    freq: Freq,
    fallback: Option<M>,
}

impl<M: ForecastModel> SeriesForecaster<M> {
    pub fn new(models: Vec<M>, freq: Freq, fallback: Option<M>) -> ForecastResult<Self> {
        if models.is_empty() {
            return Err(ForecastError::invalid_input("at least one model is required"));
        }
        Ok(Self {
            models,
            freq,
            fallback,
        })
    }

    pub fn models(&self) -> &[M] {
        &self.models
    }

    /// Predict `h` steps past the end of every series.
    ///
    /// Columns of `data` other than `unique_id`, `ds` and `y` are exogenous
    /// regressors; their future values must come in `x_future`, exactly `h`
    /// rows per series.
    pub fn forecast(
        &self,
        data: &Frame,
        args: &ForecastArgs,
        x_future: Option<&Frame>,
    ) -> ForecastResult<Frame> {
        let h = args.h()?;
        let exog = exogenous_columns(data.schema())?;

        let future_parts = match x_future {
            Some(x) => {
                x.schema().require(ID_COL)?;
                x.schema().require(TIME_COL)?;
                for name in &exog {
                    if !x.schema().contains(name) {
                        return Err(ForecastError::exogenous(format!(
                            "future values are missing regressor `{name}`"
                        )));
                    }
                }
                Some(x.partition_by(ID_COL)?)
            }
            None if !exog.is_empty() => {
                return Err(ForecastError::exogenous(format!(
                    "data has exogenous columns {exog:?} but no future values were provided"
                )));
            }
            None => None,
        };

        let mut fields = key_fields(data.schema())?;
        fields.extend(self.model_fields());
        let mut out = Frame::new(Schema::new(fields)?);

        for (key, part) in data.partition_by(ID_COL)? {
            let series = Series::from_partition(key, part, &exog)?;
            debug!(series = %series.key, rows = series.len(), h, "forecasting series");

            let future = match &future_parts {
                Some(parts) if !exog.is_empty() => {
                    let mut part = parts.get(&series.key).cloned().ok_or_else(|| {
                        ForecastError::exogenous(format!(
                            "no future values for series `{}`",
                            series.key
                        ))
                    })?;
                    if part.len() != h {
                        return Err(ForecastError::exogenous(format!(
                            "series `{}` has {} future rows but h={h}",
                            series.key,
                            part.len()
                        )));
                    }
                    part.sort_by(&[TIME_COL])?;
                    Some(regressors(&part, &exog)?)
                }
                _ => None,
            };

            let mut input = SeriesInput::new(&series.y);
            if let (Some(history), Some(future)) = (series.regressors.as_ref(), future.as_ref()) {
                input = input.with_regressors(history, future);
            }
            let predictions = self.predict_all(&input, h, &series.key)?;

            let last = series.ds.last().ok_or_else(|| {
                ForecastError::insufficient(format!("series `{}`", series.key), 1, 0)
            })?;
            for step in 0..h {
                let ds = self.freq.advance(last, step as u32 + 1)?;
                let mut row: Row = vec![series.id.clone(), ds];
                row.extend(predictions.iter().map(|p| Value::Float(p[step])));
                out.push_row(row)?;
            }
        }
        Ok(out)
    }

    /// Rolling-origin evaluation over the tail of every series.
    ///
    /// Produces `unique_id, ds, <exogenous...>, cutoff, y, <models...>`, one row
    /// per cutoff and forecast step.
    pub fn cross_validation(&self, data: &Frame, args: &ForecastArgs) -> ForecastResult<Frame> {
        let windows = args.cv_windows()?;
        let h = windows.h;
        let exog = exogenous_columns(data.schema())?;

        let time_dtype = data.schema().field(TIME_COL)?.dtype;
        let mut fields = key_fields(data.schema())?;
        for name in &exog {
            fields.push(data.schema().field(name)?.clone());
        }
        fields.push(Field::new(CUTOFF_COL, time_dtype));
        fields.push(Field::new(TARGET_COL, DType::Float));
        fields.extend(self.model_fields());
        let mut out = Frame::new(Schema::new(fields)?);

        for (key, part) in data.partition_by(ID_COL)? {
            let series = Series::from_partition(key, part, &exog)?;
            let n = series.len();
            let needed = windows.test_size() + 1;
            if n < needed {
                return Err(ForecastError::insufficient(
                    format!("cross-validation of series `{}`", series.key),
                    needed,
                    n,
                ));
            }
            debug!(series = %series.key, rows = n, windows = windows.n_windows, "cross-validating series");

            for window in 0..windows.n_windows {
                let cutoff = n - windows.test_size() + window * windows.step_size - 1;
                let start = windows
                    .input_size
                    .map(|size| (cutoff + 1).saturating_sub(size))
                    .unwrap_or(0);
                let test = cutoff + 1..cutoff + 1 + h;

                let history = series.regressors.as_ref().map(|r| r.slice(start, cutoff + 1));
                let future = series.regressors.as_ref().map(|r| r.slice(test.start, test.end));
                let mut input = SeriesInput::new(&series.y[start..=cutoff]);
                if let (Some(history), Some(future)) = (history.as_ref(), future.as_ref()) {
                    input = input.with_regressors(history, future);
                }
                let predictions = self.predict_all(&input, h, &series.key)?;

                for (step, idx) in test.enumerate() {
                    let mut row: Row = vec![series.id.clone(), series.ds[idx].clone()];
                    row.extend(series.exog_values[idx].iter().cloned());
                    row.push(series.ds[cutoff].clone());
                    row.push(Value::Float(series.y[idx]));
                    row.extend(predictions.iter().map(|p| Value::Float(p[step])));
                    out.push_row(row)?;
                }
            }
        }
        Ok(out)
    }

    fn model_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.models
            .iter()
            .map(|m| Field::new(m.alias(), DType::Float))
    }

    fn predict_all(
        &self,
        input: &SeriesInput<'_>,
        h: usize,
        series: &KeyValue,
    ) -> ForecastResult<Vec<Vec<f64>>> {
        self.models
            .iter()
            .map(|model| self.predict(model, input, h, series))
            .collect()
    }

    /// Run one model, substituting the fallback's forecast if it fails.
    fn predict(
        &self,
        model: &M,
        input: &SeriesInput<'_>,
        h: usize,
        series: &KeyValue,
    ) -> ForecastResult<Vec<f64>> {
        let result = match model.forecast(input, h) {
            Ok(values) => Ok(values),
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        series = %series,
                        model = %model.alias(),
                        fallback = %fallback.alias(),
                        error = %err,
                        "model failed, using fallback"
                    );
                    fallback.forecast(input, h).map_err(|fallback_err| {
                        ForecastError::model_failed(
                            model.alias(),
                            format!(
                                "{err}; fallback `{}` also failed: {fallback_err}",
                                fallback.alias()
                            ),
                        )
                    })
                }
                None => Err(err),
            },
        }?;
        if result.len() != h {
            return Err(ForecastError::model_failed(
                model.alias(),
                format!("returned {} values for h={h}", result.len()),
            ));
        }
        Ok(result)
    }
}

/// Fit `models` on each series of `data` and forecast `args.h()` steps.
pub fn fit_and_forecast<M: ForecastModel + Clone>(
    data: &Frame,
    models: &[M],
    freq: Freq,
    fallback: Option<&M>,
    args: &ForecastArgs,
    x_future: Option<&Frame>,
) -> ForecastResult<Frame> {
    SeriesForecaster::new(models.to_vec(), freq, fallback.cloned())?.forecast(data, args, x_future)
}

/// Fit `models` on rolling training windows of each series of `data`.
pub fn fit_and_cross_validate<M: ForecastModel + Clone>(
    data: &Frame,
    models: &[M],
    freq: Freq,
    fallback: Option<&M>,
    args: &ForecastArgs,
) -> ForecastResult<Frame> {
    SeriesForecaster::new(models.to_vec(), freq, fallback.cloned())?.cross_validation(data, args)
}

/// One entity's history, sorted by time.
struct Series {
    key: KeyValue,
    id: Value,
    ds: Vec<Value>,
    y: Vec<f64>,
    exog_values: Vec<Vec<Value>>,
    regressors: Option<Regressors>,
}

impl Series {
    fn from_partition(key: KeyValue, mut part: Frame, exog: &[String]) -> ForecastResult<Self> {
        part.sort_by(&[TIME_COL])?;
        let y = part.floats(TARGET_COL)?;
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::invalid_input(format!(
                "series `{key}` has missing or non-finite target values"
            )));
        }
        let ds: Vec<Value> = part.values(TIME_COL)?.cloned().collect();
        let exog_idx = exog
            .iter()
            .map(|name| part.schema().require(name))
            .collect::<Result<Vec<_>, _>>()?;
        let exog_values = part
            .rows()
            .iter()
            .map(|row| exog_idx.iter().map(|&i| row[i].clone()).collect())
            .collect();
        let regressors = if exog.is_empty() {
            None
        } else {
            Some(regressors(&part, exog)?)
        };
        Ok(Self {
            id: Value::from(key.clone()),
            key,
            ds,
            y,
            exog_values,
            regressors,
        })
    }

    fn len(&self) -> usize {
        self.y.len()
    }
}

fn key_fields(schema: &Schema) -> ForecastResult<Vec<Field>> {
    Ok(vec![
        schema.field(ID_COL)?.clone(),
        schema.field(TIME_COL)?.clone(),
    ])
}

/// Every column except the key, time and target columns.
fn exogenous_columns(schema: &Schema) -> ForecastResult<Vec<String>> {
    for required in [ID_COL, TIME_COL, TARGET_COL] {
        schema.require(required)?;
    }
    Ok(schema
        .exclude(&[ID_COL, TIME_COL, TARGET_COL])
        .names()
        .map(String::from)
        .collect())
}

fn regressors(frame: &Frame, names: &[String]) -> ForecastResult<Regressors> {
    let columns = names
        .iter()
        .map(|name| frame.floats(name))
        .collect::<Result<Vec<_>, _>>()?;
    let rows = (0..frame.len())
        .map(|i| columns.iter().map(|c| c[i]).collect())
        .collect();
    Ok(Regressors::new(names.to_vec(), rows))
}
