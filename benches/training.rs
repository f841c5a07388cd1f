use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use digitforge::data::digits;
use digitforge::model::{Classifier, RandomForestClassifier};
use digitforge::training::{select, CandidateConfig, CandidateTrainer, Hyperparameters};

fn bench_forest_fit(c: &mut Criterion) {
    let ds = digits::load_digits().unwrap();
    let mut group = c.benchmark_group("forest_fit");
    group.sample_size(10); // Fewer samples for training benchmarks

    for &(n_estimators, max_depth) in [(10, 3), (20, 5), (100, 10)].iter() {
        group.bench_with_input(
            BenchmarkId::new("digits", format!("{}x{}", n_estimators, max_depth)),
            &ds,
            |b, ds| {
                b.iter(|| {
                    let mut model = RandomForestClassifier::new(n_estimators)
                        .with_max_depth(Some(max_depth))
                        .with_random_state(42);
                    model.fit(black_box(&ds.features), black_box(&ds.labels)).unwrap();
                    model
                })
            },
        );
    }

    group.finish();
}

fn bench_predict_one(c: &mut Criterion) {
    let ds = digits::load_digits().unwrap();
    let mut model = RandomForestClassifier::new(100)
        .with_max_depth(Some(10))
        .with_random_state(42);
    model.fit(&ds.features, &ds.labels).unwrap();
    let sample = ds.features.row(0);

    c.bench_function("predict_proba_one/100x10", |b| {
        b.iter(|| model.predict_proba_one(black_box(sample)).unwrap())
    });
}

fn bench_candidate_selection(c: &mut Criterion) {
    let ds = digits::load_digits().unwrap().truncate(500);
    let configs = vec![
        CandidateConfig::new("FastModel_10_3", Hyperparameters::new(10, Some(3), 42)),
        CandidateConfig::new("FastModel_20_5", Hyperparameters::new(20, Some(5), 42)),
    ];
    let trainer = CandidateTrainer::default();

    let mut group = c.benchmark_group("selection");
    group.sample_size(10);
    group.bench_function("fast_mode", |b| {
        b.iter(|| {
            let (_, results) = trainer.train(black_box(&ds.features), black_box(&ds.labels), &configs).unwrap();
            select(results).unwrap().winner_index()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_forest_fit, bench_predict_one, bench_candidate_selection);
criterion_main!(benches);
