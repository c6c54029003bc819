//! Shared criterion settings for the split benchmarks
pub mod config {
    use criterion::{measurement::WallTime, BenchmarkGroup, Criterion};
    #[cfg(not(target_os = "windows"))]
    use pprof::criterion::{Output, PProfProfiler};
    use std::time::Duration;

    #[cfg(not(target_os = "windows"))]
    pub fn get_default_profiling_configs() -> Criterion {
        Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
    }

    /// Level splits are short and noisy, so samples are many and the noise threshold loose
    pub fn set_default_benchmark_configs(benchmark: &mut BenchmarkGroup<WallTime>) {
        benchmark
            .sample_size(100)
            .measurement_time(Duration::new(8, 0))
            .confidence_level(0.97)
            .warm_up_time(Duration::new(3, 0))
            .noise_threshold(0.05);
    }
}
