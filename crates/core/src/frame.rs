//! Local in-memory tables.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::schema::{Field, Schema};
use crate::value::{DType, KeyValue, Value};

/// One row, positionally aligned with the frame's schema.
pub type Row = Vec<Value>;

/// A fully materialized table: a schema plus rows that conform to it.
///
/// Every mutation goes through validation, so a `Frame` never holds a row of
/// the wrong arity or a value of the wrong type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    schema: Schema,
    rows: Vec<Row>,
}

/// Unvalidated wire form of a [`Frame`].
#[derive(Deserialize)]
struct RawFrame {
    schema: Schema,
    #[serde(default)]
    rows: Vec<Row>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = CoreError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        Frame::from_rows(raw.schema, raw.rows)
    }
}

impl Frame {
    /// An empty frame with the given columns.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a frame, validating (and widening) every row.
    pub fn from_rows(schema: Schema, rows: Vec<Row>) -> CoreResult<Self> {
        let mut frame = Self::new(schema);
        frame.rows.reserve(rows.len());
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    pub fn push_row(&mut self, row: Row) -> CoreResult<()> {
        let row = check_row(&self.schema, row)?;
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in row order.
    pub fn values(&self, name: &str) -> CoreResult<impl Iterator<Item = &Value> + '_> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// A numeric column as floats; nulls read as NaN.
    pub fn floats(&self, name: &str) -> CoreResult<Vec<f64>> {
        let field = self.schema.field(name)?;
        if !matches!(field.dtype, DType::Float | DType::Int) {
            return Err(CoreError::TypeMismatch {
                column: name.to_string(),
                expected: DType::Float.to_string(),
                actual: field.dtype.to_string(),
            });
        }
        Ok(self
            .values(name)?
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect())
    }

    /// Split into one frame per distinct key value, ordered by key.
    ///
    /// Rows keep their relative order inside each partition.
    pub fn partition_by(&self, key: &str) -> CoreResult<BTreeMap<KeyValue, Frame>> {
        let idx = self.schema.require(key)?;
        let mut parts: BTreeMap<KeyValue, Frame> = BTreeMap::new();
        for row in &self.rows {
            let k = row[idx].to_key().ok_or_else(|| CoreError::InvalidPartitionKey {
                column: key.to_string(),
                reason: format!("`{}` cannot identify a partition", row[idx]),
            })?;
            parts
                .entry(k)
                .or_insert_with(|| Frame::new(self.schema.clone()))
                .rows
                .push(row.clone());
        }
        Ok(parts)
    }

    /// Project and widen to `target`, matching columns by name.
    ///
    /// Extra columns are dropped; a missing column is an error.
    pub fn conform(self, target: &Schema) -> CoreResult<Frame> {
        if &self.schema == target {
            return Ok(self);
        }
        let mapping = target
            .fields()
            .iter()
            .map(|f| self.schema.require(&f.name))
            .collect::<CoreResult<Vec<_>>>()?;
        let mut out = Frame::new(target.clone());
        out.rows.reserve(self.rows.len());
        for row in self.rows {
            let projected = mapping.iter().map(|&i| row[i].clone()).collect();
            out.push_row(projected)?;
        }
        Ok(out)
    }

    /// Only the named columns, in the given order.
    pub fn select(self, names: &[&str]) -> CoreResult<Frame> {
        let fields = names
            .iter()
            .map(|n| self.schema.field(n).cloned())
            .collect::<CoreResult<Vec<Field>>>()?;
        let target = Schema::new(fields)?;
        self.conform(&target)
    }

    /// Row-concatenate frames under one schema, conforming each input.
    pub fn concat(schema: Schema, frames: impl IntoIterator<Item = Frame>) -> CoreResult<Frame> {
        let mut out = Frame::new(schema);
        for frame in frames {
            let frame = frame.conform(&out.schema)?;
            out.rows.extend(frame.rows);
        }
        Ok(out)
    }

    /// Stable sort by the given columns, ascending.
    pub fn sort_by(&mut self, columns: &[&str]) -> CoreResult<()> {
        let idxs = columns
            .iter()
            .map(|c| self.schema.require(c))
            .collect::<CoreResult<Vec<_>>>()?;
        self.rows.sort_by(|a, b| {
            idxs.iter()
                .map(|&i| compare_values(&a[i], &b[i]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        Ok(())
    }
}

fn check_row(schema: &Schema, row: Row) -> CoreResult<Row> {
    if row.len() != schema.len() {
        return Err(CoreError::validation(format!(
            "row has {} values but schema `{}` has {} columns",
            row.len(),
            schema,
            schema.len()
        )));
    }
    row.into_iter()
        .zip(schema.fields())
        .map(|(value, field)| {
            let actual = value.dtype();
            value.cast_to(field.dtype).ok_or_else(|| CoreError::TypeMismatch {
                column: field.name.clone(),
                expected: field.dtype.to_string(),
                actual: actual.map(|t| t.to_string()).unwrap_or_else(|| "null".into()),
            })
        })
        .collect()
}

/// Total order used for sorting: nulls first, numbers numerically, then by type.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Timestamp(_) => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (x, y) if rank(x) == 2 && rank(y) == 2 => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.total_cmp(&y)
        }
        (x, y) => rank(x).cmp(&rank(y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        let schema: Schema = "unique_id:str,ds:int,y:float".parse().unwrap();
        Frame::from_rows(
            schema,
            vec![
                vec!["b".into(), Value::Int(2), Value::Int(20)],
                vec!["a".into(), Value::Int(2), Value::Float(2.0)],
                vec!["b".into(), Value::Int(1), Value::Float(10.0)],
                vec!["a".into(), Value::Int(1), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_are_validated_and_widened() {
        let frame = sample();
        assert_eq!(frame.rows()[0][2], Value::Float(20.0));

        let schema: Schema = "a:int".parse().unwrap();
        let err = Frame::from_rows(schema.clone(), vec![vec![Value::Float(1.5)]]).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
        assert!(Frame::from_rows(schema, vec![vec![]]).is_err());
    }

    #[test]
    fn partition_by_groups_in_key_order_and_keeps_row_order() {
        let parts = sample().partition_by("unique_id").unwrap();
        let keys: Vec<_> = parts.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        let b = &parts[&KeyValue::Str("b".into())];
        let ds: Vec<_> = b.values("ds").unwrap().cloned().collect();
        assert_eq!(ds, vec![Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn deserialization_validates_rows() {
        let frame = sample();
        let json = serde_json::to_value(&frame).unwrap();
        let back: Frame = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, frame);

        let mut short = json.clone();
        short["rows"][0].as_array_mut().unwrap().truncate(1);
        let err = serde_json::from_value::<Frame>(short).unwrap_err();
        assert!(err.to_string().contains("columns"), "{err}");

        let mut mistyped = json;
        mistyped["rows"][1][2] = serde_json::to_value(Value::from("two")).unwrap();
        assert!(serde_json::from_value::<Frame>(mistyped).is_err());
    }

    #[test]
    fn float_keys_are_rejected() {
        let err = sample().partition_by("y").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPartitionKey { .. }));
    }

    #[test]
    fn conform_projects_by_name_and_fails_on_missing() {
        let target: Schema = "y:float,unique_id:str".parse().unwrap();
        let out = sample().conform(&target).unwrap();
        assert_eq!(out.rows()[0], vec![Value::Float(20.0), "b".into()]);

        let missing: Schema = "cutoff:timestamp".parse().unwrap();
        assert_eq!(
            sample().conform(&missing).unwrap_err(),
            CoreError::unknown_column("cutoff")
        );
    }

    #[test]
    fn sort_by_id_then_time() {
        let mut frame = sample();
        frame.sort_by(&["unique_id", "ds"]).unwrap();
        let ids: Vec<_> = frame.values("unique_id").unwrap().map(|v| v.to_string()).collect();
        let ds: Vec<_> = frame.values("ds").unwrap().cloned().collect();
        assert_eq!(ids, vec!["a", "a", "b", "b"]);
        assert_eq!(ds, vec![Value::Int(1), Value::Int(2), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn floats_reads_nulls_as_nan() {
        let ys = sample().floats("y").unwrap();
        assert!(ys[3].is_nan());
        assert!(sample().floats("unique_id").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: partitioning then concatenating loses no rows and never splits an entity.
            #[test]
            fn partition_covers_every_row_once(ids in proptest::collection::vec(0i64..6, 0..60)) {
                let schema: Schema = "unique_id:int,y:float".parse().unwrap();
                let rows = ids.iter().enumerate()
                    .map(|(i, id)| vec![Value::Int(*id), Value::Float(i as f64)])
                    .collect();
                let frame = Frame::from_rows(schema.clone(), rows).unwrap();
                let parts = frame.partition_by("unique_id").unwrap();

                for (key, part) in &parts {
                    prop_assert!(part.values("unique_id").unwrap().all(|v| v.to_key().as_ref() == Some(key)));
                }
                let merged = Frame::concat(schema, parts.into_values()).unwrap();
                prop_assert_eq!(merged.len(), ids.len());
            }
        }
    }
}
