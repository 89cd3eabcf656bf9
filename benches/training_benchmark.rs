//! Benchmark ensemble training and batch inference on synthetic customers
//!
//! Run with: cargo bench --bench training_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use churnscope::pipeline::{fit_pipeline, predict, TrainerConfig};

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];

/// Generate telco-style customers with a noisy contract/tenure churn signal
fn generate_customers(n_rows: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut contract = Vec::with_capacity(n_rows);
    let mut internet = Vec::with_capacity(n_rows);
    let mut tenure = Vec::with_capacity(n_rows);
    let mut charges = Vec::with_capacity(n_rows);
    let mut churn = Vec::with_capacity(n_rows);

    for _ in 0..n_rows {
        let c = CONTRACTS[rng.gen_range(0..3)];
        let t = rng.gen_range(0..72) as f64;
        let m = 20.0 + rng.gen::<f64>() * 100.0;
        let risk = if c == "Month-to-month" { 0.5 } else { 0.1 } + if t < 12.0 { 0.2 } else { 0.0 };

        contract.push(c);
        internet.push(INTERNET[rng.gen_range(0..3)]);
        tenure.push(t);
        charges.push(m);
        churn.push(if rng.gen::<f64>() < risk { "Yes" } else { "No" });
    }

    df! {
        "Contract" => contract,
        "InternetService" => internet,
        "tenure" => tenure,
        "MonthlyCharges" => charges,
        "Churn" => churn,
    }
    .expect("Failed to create DataFrame")
}

fn benchmark_training_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("training_by_rows");
    group.sample_size(10);

    let config = TrainerConfig {
        n_estimators: 50,
        ..Default::default()
    };

    for n_rows in [1_000, 5_000, 10_000] {
        let df = generate_customers(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::new("fit_pipeline", n_rows), &df, |b, df| {
            b.iter(|| fit_pipeline(black_box(df), black_box(&config)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_training_by_trees(c: &mut Criterion) {
    let mut group = c.benchmark_group("training_by_trees");
    group.sample_size(10);

    let df = generate_customers(5_000, 7);
    for n_estimators in [10, 50, 100] {
        let config = TrainerConfig {
            n_estimators,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::new("fit_pipeline", n_estimators),
            &config,
            |b, config| {
                b.iter(|| fit_pipeline(black_box(&df), black_box(config)).unwrap());
            },
        );
    }

    group.finish();
}

fn benchmark_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("inference");

    let train = generate_customers(5_000, 1);
    let pipeline = fit_pipeline(&train, &TrainerConfig::default()).unwrap();

    for n_rows in [100, 1_000, 10_000] {
        let batch = generate_customers(n_rows, 2).drop("Churn").unwrap();
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::new("predict", n_rows), &batch, |b, batch| {
            b.iter(|| predict(black_box(batch), black_box(&pipeline)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_training_by_rows,
    benchmark_training_by_trees,
    benchmark_inference
);
criterion_main!(benches);
