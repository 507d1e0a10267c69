//! Benchmarks for schedule construction.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polysched::prelude::*;

/// A chain of `n` one-dimensional statements, each reading its predecessor.
fn chain(n: usize) -> ScheduleConstraints {
    let sets: Vec<IntegerSet> = (0..n)
        .map(|k| IntegerSet::rectangular(&format!("S{}", k), &[16]))
        .collect();
    let validity: UnionRelation = sets.windows(2)
        .map(|w| Relation::translation(&w[0], &w[1], &[0]))
        .collect();
    ScheduleConstraints::on_domain(sets.into_iter().collect()).with_validity(validity)
}

/// A two-dimensional stencil with unit dependences along both axes.
fn stencil() -> ScheduleConstraints {
    let s = IntegerSet::rectangular("S", &[32, 32]);
    let validity = UnionRelation::new()
        .with(Relation::translation(&s, &s, &[1, 0]))
        .with(Relation::translation(&s, &s, &[0, 1]))
        .with(Relation::translation(&s, &s, &[1, -1]));
    let proximity = validity.clone();
    ScheduleConstraints::from_validity_proximity(UnionSet::new().with(s), validity, proximity)
}

/// Benchmark band construction on fusable chains.
fn bench_chain(c: &mut Criterion) {
    let options = ScheduleOptions::default();
    for n in [2, 4, 8] {
        let constraints = chain(n);
        c.bench_function(&format!("schedule_chain_{}", n), |b| {
            b.iter(|| polysched::compute_schedule(black_box(&constraints), &options).unwrap())
        });
    }
}

/// Benchmark a single statement with skewed dependences.
fn bench_stencil(c: &mut Criterion) {
    let constraints = stencil();
    let options = ScheduleOptions::default().with_max_coefficient(4);
    c.bench_function("schedule_stencil_2d", |b| {
        b.iter(|| polysched::compute_schedule(black_box(&constraints), &options).unwrap())
    });
}

/// Benchmark the Feautrier fallback on a chain.
fn bench_feautrier(c: &mut Criterion) {
    let constraints = chain(4);
    let options = ScheduleOptions::default().with_algorithm(ScheduleAlgorithm::Feautrier);
    c.bench_function("schedule_feautrier_chain_4", |b| {
        b.iter(|| polysched::compute_schedule(black_box(&constraints), &options).unwrap())
    });
}

/// Benchmark building the band forest view.
fn bench_forest(c: &mut Criterion) {
    let schedule = polysched::compute_schedule(&chain(8), &ScheduleOptions::default()).unwrap();
    c.bench_function("band_forest_chain_8", |b| {
        b.iter(|| black_box(schedule.clone()).forest_schedule_map())
    });
}

criterion_group!(benches, bench_chain, bench_stencil, bench_feautrier, bench_forest);
criterion_main!(benches);
