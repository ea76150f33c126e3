use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dissonor_core::prelude::*;

const SR: f32 = 48_000.0;
const N: usize = 2048;

fn frame() -> Vec<f32> {
    (0..N)
        .map(|i| {
            let t = i as f32 / SR;
            (TAU * 440.0 * t).sin() + 0.5 * (TAU * 1250.0 * t).sin()
        })
        .collect()
}

fn bench_fft(c: &mut Criterion) {
    let fft = Radix2Fft::new(N).unwrap();
    let src = frame();
    let mut re = vec![0.0; N];
    let mut im = vec![0.0; N];
    c.bench_function("radix2 forward 2048", |b| {
        b.iter(|| {
            re.copy_from_slice(&src);
            im.fill(0.0);
            fft.forward(black_box(&mut re), black_box(&mut im)).unwrap();
        })
    });
}

fn bench_analysis(c: &mut Criterion) {
    let fft = Radix2Fft::new(N).unwrap();
    let win = HannWindow::new(N);
    let det = PeakDetector::default();
    let rolloff = Rolloff::default();
    let src = frame();
    let mut re = vec![0.0; N];
    let mut im = vec![0.0; N];
    let mut mags = vec![0.0; N / 2];
    let history = [528.0f32, 1500.0];
    c.bench_function("window+fft+peaks 2048", |b| {
        b.iter(|| {
            win.apply(&src, &mut re);
            im.fill(0.0);
            fft.forward(&mut re, &mut im).unwrap();
            magnitudes(&re, &im, &mut mags);
            reject_near(&mut mags, bin_hz(SR, N), history, 20.0, REJECTION_FACTOR);
            rolloff.apply(&mut mags, bin_hz(SR, N));
            black_box(det.detect(&mags, SR, N))
        })
    });
}

criterion_group!(benches, bench_fft, bench_analysis);
criterion_main!(benches);
