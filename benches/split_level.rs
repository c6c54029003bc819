use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::rngs::SmallRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rankforest::benchmarks::config;
use rankforest::{
    InductionParams, ParamGuard, PreSorted, PredictorStore, SplitEngine, StagedSamples,
};

fn bench(c: &mut Criterion) {
    let mut benchmark = c.benchmark_group("split_level");
    config::set_default_benchmark_configs(&mut benchmark);
    let mut rng = SmallRng::seed_from_u64(42);

    for n_row in [1_000, 10_000, 50_000] {
        // one decimal of resolution leaves plenty of ties and dense ranks
        let num = Array2::random_using((n_row, 8), Uniform::new(0., 10.), &mut rng)
            .mapv(|x: f64| (x * 10.).round() / 10.);
        let fac = Array2::random_using((n_row, 4), Uniform::new(0, 12), &mut rng);
        let y: Array1<f64> = num.sum_axis(Axis(1));

        let params = InductionParams::new().pred_fixed(4).check().unwrap();
        let presorted = PreSorted::new(&num, &fac).unwrap();
        benchmark.bench_function(BenchmarkId::new("store", n_row), |bencher| {
            bencher.iter(|| PredictorStore::new(black_box(&presorted), &params).unwrap());
        });

        let store = PredictorStore::new(&presorted, &params).unwrap();
        let engine = SplitEngine::new(&store, &params).unwrap();
        let mut stage = StagedSamples::regression(&store, &y, &vec![1; n_row]).unwrap();
        let frontier = stage.frontier().to_vec();
        benchmark.bench_function(BenchmarkId::new("root", n_row), |bencher| {
            let mut rng = SmallRng::seed_from_u64(7);
            bencher.iter(|| engine.split_level(black_box(&frontier), &mut stage, &mut rng));
        });
    }
}

#[cfg(not(target_os = "windows"))]
criterion_group! {
    name = benches;
    config = config::get_default_profiling_configs();
    targets = bench
}
#[cfg(target_os = "windows")]
criterion_group!(benches, bench);

criterion_main!(benches);
