//! The partitioned forecast dispatcher.
//!
//! A backend turns one `forecast` or `cross_validation` call into one engine
//! job: resolve the output schema, ship the models once, run a worker per
//! series and hand the merged result back. It keeps no state between calls.

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use shardcast_core::{ForecastArgs, Freq, SchemaSpec, ID_COL, TARGET_COL, TIME_COL};
use shardcast_engine::{
    select_output, Broadcast, EngineHandle, ExecutionEngine, PartitionFn, PartitionSpec, Table,
    TransformJob, WorkerError, ZipJob,
};
use shardcast_models::ModelSpec;

use crate::config::BackendConfig;
use crate::cotransform::co_transform;
use crate::error::{surface, DistributedError, DistributedResult};
use crate::schema::{cross_validation_spec, forecast_spec, pinned_forecast_spec};
use crate::workers::{
    cross_validate_partition, forecast_partition, forecast_partition_with_exog, JobParams,
};

/// Runs the forecasting component over every series of a table.
pub trait ParallelBackend {
    /// Forecast `h` steps for every series of `df`.
    ///
    /// With `x_df`, each series is forecast together with its future
    /// regressors, which must cover exactly `h` rows.
    fn forecast(
        &self,
        df: &Table,
        models: &[ModelSpec],
        freq: Freq,
        fallback: Option<&ModelSpec>,
        x_df: Option<&Table>,
        args: &ForecastArgs,
    ) -> DistributedResult<Table>;

    /// Rolling-window evaluation of every series of `df`.
    fn cross_validation(
        &self,
        df: &Table,
        models: &[ModelSpec],
        freq: Freq,
        fallback: Option<&ModelSpec>,
        args: &ForecastArgs,
    ) -> DistributedResult<Table>;
}

/// [`ParallelBackend`] over an [`ExecutionEngine`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent, bound(deserialize = "E: Deserialize<'de> + Default"))]
pub struct EngineBackend<E = EngineHandle> {
    config: BackendConfig<E>,
}

impl<E: ExecutionEngine> EngineBackend<E> {
    pub fn new(config: BackendConfig<E>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackendConfig<E> {
        &self.config
    }

    fn params(
        &self,
        models: &[ModelSpec],
        freq: Freq,
        fallback: Option<&ModelSpec>,
        args: &ForecastArgs,
    ) -> DistributedResult<(Broadcast, ForecastArgs)> {
        let args = self.config.defaults.merged_with(args);
        let params = JobParams {
            models: models.to_vec(),
            freq,
            fallback: fallback.cloned(),
            args: args.clone(),
        };
        Ok((Broadcast::encode(&params)?, args))
    }

    fn dispatch(
        &self,
        df: &Table,
        worker: &PartitionFn<'_>,
        schema: &SchemaSpec,
        params: &Broadcast,
    ) -> DistributedResult<Table> {
        let partition = PartitionSpec::entity();
        let job = TransformJob {
            worker,
            params,
            schema,
            partition: &partition,
            conf: &self.config.conf,
        };
        let result = self.config.engine.transform(df, job).map_err(surface)?;
        let kind = select_output(df.is_native(), self.config.output);
        info!(dataset = %result.dataset(), rows = result.len(), output = ?kind, "job finished");
        Ok(kind.apply(result)?)
    }
}

fn require_history_columns(df: &Table) -> DistributedResult<()> {
    for column in [ID_COL, TIME_COL, TARGET_COL] {
        if !df.schema().contains(column) {
            return Err(DistributedError::configuration(format!(
                "input is missing the `{column}` column"
            )));
        }
    }
    Ok(())
}

impl<E: ExecutionEngine> ParallelBackend for EngineBackend<E> {
    fn forecast(
        &self,
        df: &Table,
        models: &[ModelSpec],
        freq: Freq,
        fallback: Option<&ModelSpec>,
        x_df: Option<&Table>,
        args: &ForecastArgs,
    ) -> DistributedResult<Table> {
        let span = info_span!("forecast", engine = self.config.engine.name(), models = models.len());
        let _guard = span.enter();

        require_history_columns(df)?;
        let (params, args) = self.params(models, freq, fallback, args)?;
        let h = args.h()?;

        match x_df {
            None => {
                let schema = forecast_spec(models)?;
                info!(h, schema = %schema, "dispatching forecast");
                let worker = |part, params: &Broadcast| {
                    forecast_partition(part, params).map_err(WorkerError::from)
                };
                self.dispatch(df, &worker, &schema, &params)
            }
            Some(x_df) => {
                for column in [ID_COL, TIME_COL] {
                    if !x_df.schema().contains(column) {
                        return Err(DistributedError::configuration(format!(
                            "X_df is missing the `{column}` column"
                        )));
                    }
                }
                let schema = pinned_forecast_spec(df.schema(), models)?;
                info!(h, schema = %schema, "dispatching forecast with future regressors");
                let worker = |history, future, params: &Broadcast| {
                    forecast_partition_with_exog(history, future, params).map_err(WorkerError::from)
                };
                let partition = PartitionSpec::entity();
                let job = ZipJob {
                    worker: &worker,
                    params: &params,
                    schema: &schema,
                    partition: &partition,
                    conf: &self.config.conf,
                };
                co_transform(&self.config.engine, df, x_df, job, self.config.output)
            }
        }
    }

    fn cross_validation(
        &self,
        df: &Table,
        models: &[ModelSpec],
        freq: Freq,
        fallback: Option<&ModelSpec>,
        args: &ForecastArgs,
    ) -> DistributedResult<Table> {
        let span = info_span!("cross_validation", engine = self.config.engine.name(), models = models.len());
        let _guard = span.enter();

        require_history_columns(df)?;
        let (params, args) = self.params(models, freq, fallback, args)?;
        let windows = args.cv_windows()?;
        let schema = cross_validation_spec(df.schema(), models)?;
        info!(
            h = windows.h,
            n_windows = windows.n_windows,
            step_size = windows.step_size,
            schema = %schema,
            "dispatching cross-validation"
        );
        let worker = |part, params: &Broadcast| {
            cross_validate_partition(part, params).map_err(WorkerError::from)
        };
        self.dispatch(df, &worker, &schema, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardcast_core::{Frame, Row, Value};

    fn df(ids: &[&str], n: u32) -> Table {
        let rows: Vec<Row> = ids
            .iter()
            .flat_map(|id| {
                (0..n).map(move |i| {
                    vec![
                        Value::from(*id),
                        Value::date(2024, 1, 1 + i).unwrap(),
                        Value::Float(i as f64),
                    ]
                })
            })
            .collect();
        Frame::from_rows("unique_id:str,ds:timestamp,y:float".parse().unwrap(), rows)
            .unwrap()
            .into()
    }

    #[test]
    fn empty_model_list_fails_before_dispatch() {
        let backend = EngineBackend::<EngineHandle>::default();
        let err = backend
            .forecast(&df(&["a"], 5), &[], Freq::daily(), None, None, &ForecastArgs::horizon(2))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn missing_horizon_is_a_configuration_error() {
        let backend = EngineBackend::<EngineHandle>::default();
        let err = backend
            .forecast(&df(&["a"], 5), &[ModelSpec::naive()], Freq::daily(), None, None, &ForecastArgs::new())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn defaults_fill_in_missing_arguments() {
        let config = BackendConfig::new(EngineHandle::local()).with_defaults(ForecastArgs::horizon(3));
        let backend = EngineBackend::new(config);
        let out = backend
            .forecast(&df(&["a"], 5), &[ModelSpec::naive()], Freq::daily(), None, None, &ForecastArgs::new())
            .unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn cross_validation_emits_cutoff_rows() {
        let backend = EngineBackend::new(BackendConfig::new(EngineHandle::threaded(Some(2))));
        let args = ForecastArgs::horizon(2).with("n_windows", 2);
        let out = backend
            .cross_validation(&df(&["a", "b"], 8), &[ModelSpec::naive()], Freq::daily(), None, &args)
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(out.schema().to_string(), "unique_id:str,ds:timestamp,cutoff:timestamp,y:float,Naive:float");
        assert_eq!(out.len(), 2 * 2 * 2);

        let first = &out.rows()[0];
        assert_eq!(first[1], Value::date(2024, 1, 5).unwrap());
        assert_eq!(first[2], Value::date(2024, 1, 4).unwrap());
        assert_eq!(first[3], Value::Float(4.0));
        assert_eq!(first[4], Value::Float(3.0));
    }

    #[test]
    fn forecasting_failures_surface_with_their_partition() {
        let backend = EngineBackend::<EngineHandle>::default();
        let err = backend
            .forecast(
                &df(&["a"], 3),
                &[ModelSpec::seasonal_naive(12)],
                Freq::daily(),
                None,
                None,
                &ForecastArgs::horizon(2),
            )
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Forecasting);
        match err {
            DistributedError::Engine(engine) => assert_eq!(engine.partition(), Some("a")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fallback_fills_the_failing_model_column() {
        let backend = EngineBackend::new(BackendConfig::new(EngineHandle::threaded(Some(2))));
        let out = backend
            .forecast(
                &df(&["a", "b"], 3),
                &[ModelSpec::seasonal_naive(12)],
                Freq::daily(),
                Some(&ModelSpec::naive()),
                None,
                &ForecastArgs::horizon(2),
            )
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(out.schema().to_string(), "unique_id:str,ds:timestamp,SeasonalNaive:float");

        let series = out.partition_by("unique_id").unwrap();
        assert_eq!(series.len(), 2);
        for frame in series.values() {
            assert_eq!(frame.floats("SeasonalNaive").unwrap(), vec![2.0, 2.0]);
        }
    }

    #[test]
    fn empty_configuration_deserializes_to_the_default_backend() {
        let backend: EngineBackend = serde_json::from_str("{}").unwrap();
        assert_eq!(backend, EngineBackend::default());

        let threaded: EngineBackend =
            serde_json::from_str(r#"{"engine":{"engine":"threaded","workers":3}}"#).unwrap();
        let json = serde_json::to_string(&threaded).unwrap();
        assert_eq!(serde_json::from_str::<EngineBackend>(&json).unwrap(), threaded);
    }
}
