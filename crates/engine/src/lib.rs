//! `shardcast-engine`
//!
//! **Responsibility:** run partitioned maps over tables.
//!
//! - `transform`: partition one table by a key, apply a worker per partition.
//! - `zip_transform`: co-group two tables by a key, apply a worker per pair.
//!
//! Engines own scheduling only. Worker failures are returned unmodified inside
//! [`EngineError::Worker`]; nothing is retried here.

pub mod broadcast;
pub mod conf;
pub mod engine;
pub mod error;
pub mod handle;
pub mod local;
pub mod output;
pub mod table;
pub mod threaded;

pub use broadcast::Broadcast;
pub use conf::{EngineConf, THREAD_NAME_PREFIX};
pub use engine::{CoPartitionFn, ExecutionEngine, PartitionFn, PartitionSpec, Task, TransformJob, ZipJob};
pub use error::{EngineError, EngineResult, WorkerError};
pub use handle::EngineHandle;
pub use local::LocalEngine;
pub use output::{select_output, OutputKind, OutputOptions};
pub use table::{RemoteFrame, Table};
pub use threaded::ThreadedEngine;

#[cfg(test)]
mod tests {
    use super::*;
    use shardcast_core::{Frame, Schema, SchemaSpec, Value};

    fn input() -> Table {
        let schema: Schema = "unique_id:str,y:float".parse().unwrap();
        let rows = ["b", "a", "b", "c", "a"]
            .iter()
            .enumerate()
            .map(|(i, id)| vec![Value::from(*id), Value::Float(i as f64)])
            .collect();
        Table::Local(Frame::from_rows(schema, rows).unwrap())
    }

    fn sum_per_entity(part: Frame, params: &Broadcast) -> Result<Frame, WorkerError> {
        let scale: f64 = params.decode()?;
        let id = part.rows()[0][0].clone();
        let total: f64 = part.floats("y")?.iter().sum();
        let schema: Schema = "unique_id:str,total:float".parse()?;
        Ok(Frame::from_rows(schema, vec![vec![id, Value::Float(total * scale)]])?)
    }

    fn run(engine: &dyn ExecutionEngine, conf: &EngineConf) -> EngineResult<Frame> {
        let params = Broadcast::encode(&2.0f64)?;
        let schema = SchemaSpec::Explicit("unique_id:str,total:float".parse()?);
        let partition = PartitionSpec::entity();
        let job = TransformJob {
            worker: &sum_per_entity,
            params: &params,
            schema: &schema,
            partition: &partition,
            conf,
        };
        Ok(engine.transform(&input(), job)?.collect()?)
    }

    #[test]
    fn engines_agree_and_merge_in_key_order() {
        let conf = EngineConf::default();
        let local = run(&LocalEngine, &conf).unwrap();
        let threaded = run(&ThreadedEngine::with_workers(3), &conf).unwrap();
        assert_eq!(local, threaded);

        let ids: Vec<_> = local.values("unique_id").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(local.floats("total").unwrap(), vec![10.0, 4.0, 6.0]);
    }

    #[test]
    fn worker_errors_keep_their_source_and_partition() {
        let failing = |part: Frame, _: &Broadcast| -> Result<Frame, WorkerError> {
            if part.rows()[0][0] == Value::from("b") {
                return Err("boom".into());
            }
            Ok(part)
        };
        let params = Broadcast::encode(&()).unwrap();
        let schema = SchemaSpec::derived(&[], Schema::empty());
        let partition = PartitionSpec::entity();
        for conf in [EngineConf::default(), EngineConf::default().with_fail_fast(false)] {
            let job = TransformJob {
                worker: &failing,
                params: &params,
                schema: &schema,
                partition: &partition,
                conf: &conf,
            };
            let err = ThreadedEngine::new().transform(&input(), job).unwrap_err();
            assert_eq!(err.partition(), Some("b"));
            assert!(err.to_string().contains("boom"));
        }
    }

    #[test]
    fn output_not_matching_schema_fails_the_job() {
        let identity = |part: Frame, _: &Broadcast| -> Result<Frame, WorkerError> { Ok(part) };
        let params = Broadcast::encode(&()).unwrap();
        let schema = SchemaSpec::Explicit("unique_id:str,forecast:float".parse().unwrap());
        let partition = PartitionSpec::entity();
        let conf = EngineConf::default();
        let job = TransformJob {
            worker: &identity,
            params: &params,
            schema: &schema,
            partition: &partition,
            conf: &conf,
        };
        let err = LocalEngine.transform(&input(), job).unwrap_err();
        assert!(matches!(err, EngineError::SchemaMismatch { .. }));
    }

    #[test]
    fn zip_delivers_both_sides_and_empty_right_for_missing_keys() {
        let right_schema: Schema = "unique_id:str,x:float".parse().unwrap();
        let right = Table::Local(
            Frame::from_rows(
                right_schema,
                vec![
                    vec![Value::from("a"), Value::Float(1.0)],
                    vec![Value::from("a"), Value::Float(2.0)],
                    vec![Value::from("z"), Value::Float(9.0)],
                ],
            )
            .unwrap(),
        );
        let counts = |left: Frame, right: Frame, _: &Broadcast| -> Result<Frame, WorkerError> {
            let schema: Schema = "unique_id:str,left:int,right:int".parse()?;
            let row = vec![
                left.rows()[0][0].clone(),
                Value::Int(left.len() as i64),
                Value::Int(right.len() as i64),
            ];
            Ok(Frame::from_rows(schema, vec![row])?)
        };
        let params = Broadcast::encode(&()).unwrap();
        let schema = SchemaSpec::Explicit("unique_id:str,left:int,right:int".parse().unwrap());
        let partition = PartitionSpec::entity();
        let conf = EngineConf::default();
        let job = ZipJob {
            worker: &counts,
            params: &params,
            schema: &schema,
            partition: &partition,
            conf: &conf,
        };
        let out = LocalEngine.zip_transform(&input(), &right, job).unwrap().collect().unwrap();
        let rows: Vec<_> = out.rows().iter().map(|r| (r[0].to_string(), r[1].clone(), r[2].clone())).collect();
        assert_eq!(
            rows,
            vec![
                ("a".to_string(), Value::Int(2), Value::Int(2)),
                ("b".to_string(), Value::Int(2), Value::Int(0)),
                ("c".to_string(), Value::Int(1), Value::Int(0)),
            ]
        );
    }

    #[test]
    fn persist_wraps_local_frames_as_native() {
        let remote = LocalEngine.persist(input());
        assert_eq!(remote.engine(), "local");
        assert_eq!(remote.num_partitions(), 1);
        assert_eq!(remote.len(), 5);
    }
}
