use criterion::{black_box, criterion_group, criterion_main, Criterion};

use snp_enrich::stats::{Linkage, Method};

/// Pseudo-random but reproducible distances in `[0, 1)`
fn distance(a: usize, b: usize) -> f64 {
    let x = (a.min(b) * 7919 + a.max(b) * 104_729) % 1000;
    x as f64 / 1000.0
}

fn cluster(len: usize, method: Method) -> usize {
    Linkage::new(len, method, distance).fcluster(0.65).len()
}

fn linkage_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("linkage");
    for method in [Method::Single, Method::Complete, Method::Average] {
        group.bench_function(format!("{method:?} 100"), |b| {
            b.iter(|| cluster(black_box(100), method))
        });
    }
    group.finish();
}

criterion_group!(benches, linkage_benchmark);
criterion_main!(benches);
