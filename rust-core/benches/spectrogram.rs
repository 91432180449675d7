use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fsi_spectral::chroma::{project, ChromaNorm, ChromaProjector};
use fsi_spectral::spectrum::{spectrogram, SpectrogramParams};
use ndarray::Array2;
use std::f64::consts::PI;

fn ensemble(n_rows: usize, n_cols: usize, fs: f64) -> Array2<f64> {
    Array2::from_shape_fn((n_rows, n_cols), |(r, i)| {
        let t = i as f64 / fs;
        (2.0 * PI * 100.0 * t).sin() + 0.3 * (2.0 * PI * 440.0 * t + r as f64).sin()
    })
}

fn bench_spectrogram(c: &mut Criterion) {
    let fs = 2500.0;
    let params = SpectrogramParams::from_window_rate(10.0, 4.0);
    let mut group = c.benchmark_group("ensemble_spectrogram");

    for &rows in &[1usize, 64, 512] {
        let matrix = ensemble(rows, 10_000, fs);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &matrix, |b, m| {
            b.iter(|| spectrogram(black_box(m.view()), fs, &params))
        });
    }
    group.finish();
}

fn bench_chroma(c: &mut Criterion) {
    let fs = 2500.0;
    let matrix = ensemble(64, 10_000, fs);
    let params = SpectrogramParams::from_window_rate(10.0, 4.0);
    let Ok(result) = spectrogram(matrix.view(), fs, &params) else {
        return;
    };
    let mut projector = ChromaProjector::default();
    let Ok(filterbank) = projector.filterbank(result.fs, result.nfft) else {
        return;
    };

    c.bench_function("chroma_projection", |b| {
        b.iter(|| project(&filterbank, black_box(&result.power), ChromaNorm::Sum))
    });
}

criterion_group!(benches, bench_spectrogram, bench_chroma);
criterion_main!(benches);
