//! Performance benchmarks for key resampling and status card rendering.
//!
//! Resampling runs once per drawn key on decks whose icons are not 72 px, so
//! it bounds how fast a full-page redraw reaches the hardware.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench render_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use satellite_core::constants::SOURCE_ICON_SIZE;
use satellite_surface::wrappers::bitmap::resample_key;
use satellite_surface::{BasicCardGenerator, CardGenerator};
use std::hint::black_box;

fn source_image() -> Vec<u8> {
    let side = SOURCE_ICON_SIZE as usize;
    (0..side * side * 3).map(|i| (i % 251) as u8).collect()
}

/// Benchmark resampling one key image to the native sizes of common decks.
fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample_key");
    group.throughput(Throughput::Elements(1));

    let image = source_image();
    for target in [72u32, 80, 96] {
        group.bench_with_input(BenchmarkId::from_parameter(target), &target, |b, &to| {
            b.iter(|| {
                let out = resample_key(0, black_box(image.clone()), SOURCE_ICON_SIZE, to).unwrap();
                black_box(out);
            });
        });
    }

    group.finish();
}

/// Benchmark rendering a full-panel status card.
fn bench_status_card(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_card");
    group.throughput(Throughput::Elements(1));

    let cards = BasicCardGenerator;
    // Original (5x3 @ 72 px) and XL (8x4 @ 96 px) panels
    for (name, width, height) in [("original", 360u32, 216u32), ("xl", 768, 384)] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let out = cards
                    .generate_status_bitmap(width, height, black_box("10.0.0.5"), "Connected")
                    .unwrap();
                black_box(out);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resample, bench_status_card);
criterion_main!(benches);
