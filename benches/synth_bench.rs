//! Benchmarks for note rendering
//!
//! A note must render well inside the time between key presses.
//!
//! Run with: cargo bench --bench synth_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keytone::synth::{synthesize, NoteSettings, Synthesizer};
use keytone::timbre::Timbre;

fn bench_timbres(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");

    for timbre in [Timbre::Sine, Timbre::Strings, Timbre::Synth, Timbre::Piano] {
        group.bench_with_input(BenchmarkId::from_parameter(timbre), &timbre, |b, &timbre| {
            b.iter(|| synthesize(black_box(261.63), 0.3, 44100, timbre))
        });
    }

    group.finish();
}

fn bench_seeded_noise(c: &mut Criterion) {
    let mut synth = Synthesizer::with_seed(NoteSettings::default(), 0);
    c.bench_function("synthesizer_noise", |b| {
        b.iter(|| synth.render(black_box(440.0), Timbre::Noise))
    });
}

criterion_group!(benches, bench_timbres, bench_seeded_noise);
criterion_main!(benches);
