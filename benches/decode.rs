//! Decode throughput on repetition-code detector error models.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use floodmatch::Matching;

/// Distance-d repetition code: d-1 detectors in a chain, boundary edges at
/// both ends, one logical observable on the left boundary edge.
fn rep_code_dem(d: usize, p: f64) -> String {
    let mut dem = String::new();
    dem.push_str(&format!("error({p}) D0 L0\n"));
    for i in 0..d.saturating_sub(2) {
        dem.push_str(&format!("error({p}) D{} D{}\n", i, i + 1));
    }
    dem.push_str(&format!("error({p}) D{}\n", d - 2));
    dem
}

fn sample_syndromes(
    num_detectors: usize,
    shots: usize,
    p: f64,
    rng: &mut Xoshiro256PlusPlus,
) -> Vec<Vec<u8>> {
    (0..shots)
        .map(|_| {
            (0..num_detectors)
                .map(|_| u8::from(rng.gen_bool(p)))
                .collect()
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("rep_code_decode");
    for &d in &[9usize, 25, 49] {
        let mut matching = Matching::from_dem(&rep_code_dem(d, 0.05)).expect("valid dem");
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed);
        let syndromes = sample_syndromes(d - 1, 256, 0.08, &mut rng);

        group.bench_with_input(BenchmarkId::from_parameter(d), &d, |b, _| {
            let mut i = 0;
            b.iter(|| {
                let s = &syndromes[i % syndromes.len()];
                i += 1;
                matching.decode(s).expect("decode succeeds")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
