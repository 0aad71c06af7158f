//! Per-partition workers.
//!
//! Each worker decodes its own copy of the job parameters, builds a forecaster
//! for the one series it was handed and runs it on the calling thread. No
//! worker spawns parallel work of its own.

use serde::{Deserialize, Serialize};
use tracing::debug;

use shardcast_core::{ForecastArgs, Frame, Freq, ID_COL};
use shardcast_engine::Broadcast;
use shardcast_models::{ModelSpec, SeriesForecaster};

use crate::error::{DistributedError, DistributedResult};

/// Everything a worker needs, shipped once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    pub models: Vec<ModelSpec>,
    pub freq: Freq,
    #[serde(default)]
    pub fallback: Option<ModelSpec>,
    #[serde(default)]
    pub args: ForecastArgs,
}

impl JobParams {
    fn decode(params: &Broadcast) -> DistributedResult<Self> {
        Ok(params.decode()?)
    }

    fn forecaster(self) -> DistributedResult<(SeriesForecaster, ForecastArgs)> {
        let forecaster = SeriesForecaster::new(self.models, self.freq, self.fallback)?;
        Ok((forecaster, self.args))
    }
}

/// Forecast one series from its history alone.
pub fn forecast_partition(history: Frame, params: &Broadcast) -> DistributedResult<Frame> {
    let (forecaster, args) = JobParams::decode(params)?.forecaster()?;
    Ok(forecaster.forecast(&history, &args, None)?)
}

/// Forecast one series given its future regressors.
///
/// `future` must hold exactly `h` rows; anything else is rejected before any
/// model runs.
pub fn forecast_partition_with_exog(
    history: Frame,
    future: Frame,
    params: &Broadcast,
) -> DistributedResult<Frame> {
    let (forecaster, args) = JobParams::decode(params)?.forecaster()?;
    let h = args.h()?;
    if future.len() != h {
        let entity = history
            .values(ID_COL)?
            .next()
            .map(ToString::to_string)
            .unwrap_or_default();
        return Err(DistributedError::HorizonMismatch {
            entity,
            rows: future.len(),
            h,
        });
    }
    debug!(rows = history.len(), future_rows = future.len(), h, "forecasting with future regressors");
    Ok(forecaster.forecast(&history, &args, Some(&future))?)
}

/// Rolling-window evaluation of one series.
pub fn cross_validate_partition(history: Frame, params: &Broadcast) -> DistributedResult<Frame> {
    let (forecaster, args) = JobParams::decode(params)?.forecaster()?;
    Ok(forecaster.cross_validation(&history, &args)?)
}
