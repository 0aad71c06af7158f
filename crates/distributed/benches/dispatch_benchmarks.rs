use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use shardcast_core::{ForecastArgs, Frame, Freq, Row, Value};
use shardcast_distributed::{BackendConfig, EngineBackend, ParallelBackend};
use shardcast_engine::{EngineHandle, Table};
use shardcast_models::ModelSpec;

/// `entities` series of 60 daily observations each.
fn panel(entities: usize) -> Table {
    let rows: Vec<Row> = (0..entities)
        .flat_map(|e| {
            (0..60u32).map(move |i| {
                vec![
                    Value::Int(e as i64),
                    Value::date(2024, 1, 1)
                        .and_then(|d| Freq::daily().advance(&d, i).ok())
                        .unwrap(),
                    Value::Float(((e as f64) + (i as f64) * 0.3).sin() * 10.0 + 50.0),
                ]
            })
        })
        .collect();
    Frame::from_rows("unique_id:int,ds:timestamp,y:float".parse().unwrap(), rows)
        .unwrap()
        .into()
}

fn models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::naive(),
        ModelSpec::seasonal_naive(7),
        ModelSpec::window_average(14),
        ModelSpec::ses(0.3),
    ]
}

fn bench_forecast_by_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("forecast_dispatch");
    let args = ForecastArgs::horizon(14);
    let models = models();

    for entities in [16usize, 256] {
        let df = panel(entities);
        group.throughput(Throughput::Elements(entities as u64));

        for (label, engine) in [
            ("local", EngineHandle::local()),
            ("threaded", EngineHandle::threaded(None)),
        ] {
            let backend = EngineBackend::new(BackendConfig::new(engine));
            group.bench_with_input(BenchmarkId::new(label, entities), &df, |b, df| {
                b.iter(|| {
                    let out = backend
                        .forecast(black_box(df), &models, Freq::daily(), None, None, &args)
                        .unwrap();
                    black_box(out.len())
                })
            });
        }
    }
    group.finish();
}

fn bench_cross_validation(c: &mut Criterion) {
    let df = panel(128);
    let args = ForecastArgs::horizon(7).with("n_windows", 4);
    let backend = EngineBackend::new(BackendConfig::new(EngineHandle::threaded(None)));
    let models = models();

    c.bench_function("cross_validation_threaded_128", |b| {
        b.iter(|| {
            let out = backend
                .cross_validation(black_box(&df), &models, Freq::daily(), None, &args)
                .unwrap();
            black_box(out.len())
        })
    });
}

criterion_group!(benches, bench_forecast_by_engine, bench_cross_validation);
criterion_main!(benches);
