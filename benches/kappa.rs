use criterion::{black_box, criterion_group, criterion_main, Criterion};

use snp_enrich::stats::KappaMatrix;
use snp_enrich::GeneSet;

/// Overlapping gene sets, each term shares half of its genes with the next one
fn gene_sets(terms: usize, genes_per_term: usize) -> Vec<GeneSet> {
    (0..terms)
        .map(|term| {
            let start = term * genes_per_term / 2;
            (start..start + genes_per_term)
                .map(|gene| format!("GENE{gene}"))
                .collect()
        })
        .collect()
}

fn kappa_benchmark(c: &mut Criterion) {
    let small = gene_sets(50, 20);
    let large = gene_sets(300, 40);

    c.bench_function("kappa matrix 50", |b| {
        b.iter(|| KappaMatrix::new(black_box(&small), black_box(20_000)))
    });
    c.bench_function("kappa matrix 300", |b| {
        b.iter(|| KappaMatrix::new(black_box(&large), black_box(20_000)))
    });
}

criterion_group!(benches, kappa_benchmark);
criterion_main!(benches);
