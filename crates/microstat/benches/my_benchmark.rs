use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use microstat::{Ensemble, EnsembleBuilder, Grid, clusters, random_field};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

fn make_image(n: usize) -> Grid<bool> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2525365464_u64);
    random_field(&[n, n], 0.4, true, &mut rng).unwrap()
}

fn help_setup_criterion_benchmark(c: &mut Criterion, statistic: &str) {
    let setup_fn = || -> Ensemble {
        EnsembleBuilder::new()
            .roi(&[9, 9])
            .statistic_name(statistic)
            .build()
            .unwrap()
    };

    let mut group = c.benchmark_group(statistic);
    for n in [32usize, 64, 128].into_iter() {
        let image = make_image(n);
        let input = if statistic == "C2" {
            clusters(&image).unwrap().into_grid()
        } else {
            image.map(|v| v as usize)
        };

        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("accumulate", n), &input, |b, input| {
            b.iter_batched_ref(
                setup_fn,
                |ensemble: &mut Ensemble| ensemble.accumulate(input, None),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn labeling_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("labeling");
    for n in [64usize, 256].into_iter() {
        let image = make_image(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("clusters", n), &image, |b, image| {
            b.iter(|| clusters(image))
        });
    }
    group.finish();
}

fn criterion_benchmark(c: &mut Criterion) {
    help_setup_criterion_benchmark(c, "S2");
    help_setup_criterion_benchmark(c, "C2");
    help_setup_criterion_benchmark(c, "L");
    labeling_benchmark(c);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
