use criterion::{criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use pprof::criterion::{Output, PProfProfiler};

use trackeval::{
    executor::{ExecutorKind, Sequential, ThreadPool},
    frame_distance::{FrameDistanceEvaluator, FrameDistanceParams},
    frames::MatchedFrame,
    image::{ImageSimilarity, Ssim},
};

fn render(width: u32, height: u32, phase: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let shade = ((x + phase) * 3 + y * 2) % 256;
        if ((x + phase) / 16 + y / 16) % 2 == 0 {
            Rgb([shade as u8, 90, 40])
        } else {
            Rgb([200, shade as u8, 160])
        }
    })
}

fn frame_distance_benchmark(c: &mut Criterion) {
    let lhs = render(640, 480, 0);
    let rhs = render(640, 480, 3);

    c.bench_function("ssim 640x480", |b| {
        let ssim = Ssim::default();
        b.iter(|| ssim.similarity(&lhs, &rhs).unwrap());
    });

    let pairs = (0..16)
        .map(|i| MatchedFrame {
            timestamp: i,
            image: render(320, 240, 0),
            matched_gt_timestamp: i,
            matched_gt_image: render(320, 240, i as u32),
        })
        .collect::<Vec<_>>();
    let evaluator = FrameDistanceEvaluator::new(FrameDistanceParams {
        diagnostic_dir: None,
        executor: ExecutorKind::Sequential,
        ..Default::default()
    })
    .unwrap();

    c.bench_function("frame distance sequential", |b| {
        b.iter(|| evaluator.evaluate_with(&pairs, &Sequential).unwrap());
    });

    let pool = ThreadPool::new(None).unwrap();
    c.bench_function("frame distance thread pool", |b| {
        b.iter(|| evaluator.evaluate_with(&pairs, &pool).unwrap());
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = frame_distance_benchmark
}

criterion_main!(benches);
