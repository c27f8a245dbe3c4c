// benches/benchmarks.rs -- Per-stage and full-pipeline benchmarks on a
// synthetic striped fingerprint image.
//
//   cargo bench

use criterion::{criterion_group, criterion_main, Criterion};

use dpfp::fprint::Frame;
use dpfp::pipeline::Pipeline;
use dpfp::{frequency, mask, matcher, minutiae, orientation, thin, IMG_HEIGHT, IMG_WIDTH};

// ============================================================
// Helpers
// ============================================================

/// Vertical ridges with an 8-pixel period, full contrast.
fn make_stripes() -> Frame {
    let mut px = vec![0u8; IMG_WIDTH * IMG_HEIGHT];
    for y in 0..IMG_HEIGHT {
        for x in 0..IMG_WIDTH {
            px[x + y * IMG_WIDTH] = if x % 8 < 4 { 0x20 } else { 0xe0 };
        }
    }
    Frame::with_pixels(&px).unwrap()
}

/// A binary skeleton with a handful of ridge segments.
fn make_skeleton() -> Frame {
    let mut px = vec![0u8; IMG_WIDTH * IMG_HEIGHT];
    for seg in 0..8usize {
        let y = 40 + seg * 30;
        for x in 60 + seg * 10..200 + seg * 10 {
            px[x + y * IMG_WIDTH] = 0xff;
        }
    }
    Frame::with_pixels(&px).unwrap()
}

// ============================================================
// Per-stage benchmarks
// ============================================================

fn bench_orientation(c: &mut Criterion) {
    let fp = make_stripes();
    let mut group = c.benchmark_group("orientation");
    group.bench_function("compute_384x289", |b| {
        b.iter(|| orientation::compute(&fp, 7, 8))
    });
    group.finish();
}

fn bench_frequency(c: &mut Criterion) {
    let fp = make_stripes();
    let dir = orientation::compute(&fp, 7, 8);
    let mut group = c.benchmark_group("frequency");
    group.bench_function("compute_384x289", |b| {
        b.iter(|| frequency::compute(&fp, &dir))
    });
    group.finish();
}

fn bench_mask(c: &mut Criterion) {
    let fp = make_stripes();
    let dir = orientation::compute(&fp, 7, 8);
    let freq = frequency::compute(&fp, &dir);
    let mut group = c.benchmark_group("mask");
    group.bench_function("compute_384x289", |b| b.iter(|| mask::compute(&freq)));
    group.finish();
}

fn bench_thin(c: &mut Criterion) {
    let mut group = c.benchmark_group("thin");
    group.bench_function("segments_384x289", |b| {
        b.iter_batched(
            make_skeleton,
            |mut fp| thin::thin(&mut fp),
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_match(c: &mut Criterion) {
    let mut a = make_skeleton();
    thin::thin(&mut a);
    let ma = minutiae::detect(&a);

    let mut group = c.benchmark_group("matcher");
    group.bench_function("self_score", |b| b.iter(|| matcher::score(&ma, &ma)));
    group.finish();
}

// ============================================================
// Full pipeline
// ============================================================

fn bench_extract(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.bench_function("extract_384x289", |b| {
        b.iter_batched(
            make_stripes,
            |mut fp| pipeline.extract(&mut fp),
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_orientation,
    bench_frequency,
    bench_mask,
    bench_thin,
    bench_match,
    bench_extract
);
criterion_main!(benches);
