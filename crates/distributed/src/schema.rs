//! Output schema resolution.
//!
//! The columns a job produces are fixed before anything is dispatched: one
//! float column per model, named by the model, plus the key and bookkeeping
//! columns of the execution mode.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use shardcast_core::{
    DType, Field, Schema, SchemaSpec, CUTOFF_COL, ID_COL, TARGET_COL, TIME_COL,
};
use shardcast_models::ForecastModel;

use crate::error::{DistributedError, DistributedResult};

/// What a dispatch computes per partition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Forecast,
    CrossValidation,
}

/// Columns appended to the input's non-target columns for `mode`.
///
/// Forecast: one float column per model, in model order. Cross-validation:
/// `cutoff:timestamp`, `y:float`, then the model columns.
///
/// Fails on an empty model list and on two models sharing a column name.
pub fn resolve_schema<M: ForecastModel>(models: &[M], mode: Mode) -> DistributedResult<Schema> {
    if models.is_empty() {
        return Err(DistributedError::configuration("at least one model is required"));
    }
    let mut fields = match mode {
        Mode::Forecast => Vec::with_capacity(models.len()),
        Mode::CrossValidation => vec![
            Field::new(CUTOFF_COL, DType::Timestamp),
            Field::new(TARGET_COL, DType::Float),
        ],
    };

    let mut seen = BTreeSet::new();
    for model in models {
        let name = model.alias();
        if [ID_COL, TIME_COL, TARGET_COL, CUTOFF_COL].contains(&name.as_str()) {
            return Err(DistributedError::configuration(format!(
                "model column `{name}` clashes with a reserved column; give the model an alias"
            )));
        }
        if !seen.insert(name.clone()) {
            return Err(DistributedError::configuration(format!(
                "two models produce the column `{name}`; give one of them an alias"
            )));
        }
        fields.push(Field::new(name, DType::Float));
    }
    Ok(Schema::new(fields)?)
}

/// `*-y+<models>`: every input column except the target, then the models.
pub fn forecast_spec<M: ForecastModel>(models: &[M]) -> DistributedResult<SchemaSpec> {
    Ok(SchemaSpec::derived(&[TARGET_COL], resolve_schema(models, Mode::Forecast)?))
}

/// `unique_id,ds,<models>` with key types taken from the history table.
///
/// Used when future regressors are joined in: the output keeps only the keys,
/// whatever exogenous columns the inputs carry.
pub fn pinned_forecast_spec<M: ForecastModel>(
    input: &Schema,
    models: &[M],
) -> DistributedResult<SchemaSpec> {
    let mut fields = vec![input.field(ID_COL)?.clone(), input.field(TIME_COL)?.clone()];
    fields.extend(resolve_schema(models, Mode::Forecast)?.fields().iter().cloned());
    Ok(SchemaSpec::Explicit(Schema::new(fields)?))
}

/// `*-y+cutoff,y,<models>`; `cutoff` takes the type of the input's `ds`.
pub fn cross_validation_spec<M: ForecastModel>(
    input: &Schema,
    models: &[M],
) -> DistributedResult<SchemaSpec> {
    let time = input.field(TIME_COL)?.dtype;
    let fields = resolve_schema(models, Mode::CrossValidation)?
        .fields()
        .iter()
        .map(|f| match f.name.as_str() {
            CUTOFF_COL => Field::new(CUTOFF_COL, time),
            _ => f.clone(),
        })
        .collect();
    Ok(SchemaSpec::derived(&[TARGET_COL], Schema::new(fields)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardcast_models::ModelSpec;

    #[test]
    fn forecast_schema_is_one_float_per_model() {
        let models = [ModelSpec::naive(), ModelSpec::historic_average()];
        let schema = resolve_schema(&models, Mode::Forecast).unwrap();
        assert_eq!(schema.to_string(), "Naive:float,HistoricAverage:float");
        assert_eq!(forecast_spec(&models).unwrap().to_string(), "*-y+Naive:float,HistoricAverage:float");
    }

    #[test]
    fn cross_validation_schema_leads_with_cutoff_and_target() {
        let schema = resolve_schema(&[ModelSpec::naive()], Mode::CrossValidation).unwrap();
        assert_eq!(schema.to_string(), "cutoff:timestamp,y:float,Naive:float");
    }

    #[test]
    fn cutoff_follows_integer_time_index() {
        let input: Schema = "unique_id:str,ds:int,y:float".parse().unwrap();
        let spec = cross_validation_spec(&input, &[ModelSpec::naive()]).unwrap();
        let resolved = spec.resolve(&input).unwrap();
        assert_eq!(resolved.to_string(), "unique_id:str,ds:int,cutoff:int,y:float,Naive:float");
    }

    #[test]
    fn pinned_spec_keeps_key_types_and_drops_regressors() {
        let input: Schema = "unique_id:int,ds:timestamp,y:float,price:float".parse().unwrap();
        let spec = pinned_forecast_spec(&input, &[ModelSpec::exogenous_regression()]).unwrap();
        assert_eq!(spec.to_string(), "unique_id:int,ds:timestamp,ExogenousRegression:float");
    }

    #[test]
    fn empty_and_duplicate_model_lists_are_rejected() {
        let none: [ModelSpec; 0] = [];
        assert!(resolve_schema(&none, Mode::Forecast).is_err());

        let twice = [ModelSpec::naive(), ModelSpec::naive()];
        let err = resolve_schema(&twice, Mode::Forecast).unwrap_err();
        assert!(err.to_string().contains("alias"));

        let aliased = [ModelSpec::naive(), ModelSpec::naive().with_alias("Naive2")];
        assert_eq!(resolve_schema(&aliased, Mode::Forecast).unwrap().len(), 2);
    }

    #[test]
    fn model_named_like_a_key_column_is_rejected() {
        let models = [ModelSpec::naive().with_alias("ds")];
        assert!(resolve_schema(&models, Mode::Forecast).is_err());
    }
}
