use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frame_audio::audio::{plan, AudioStreamConfig, SampleCopier, SimulatedDevice};

fn bench_plan(c: &mut Criterion) {
    let config = AudioStreamConfig::default();

    c.bench_function("plan_no_wrap", |b| {
        b.iter(|| plan(black_box(1000), black_box(0), black_box(&config)))
    });

    c.bench_function("plan_wrap", |b| {
        b.iter(|| plan(black_box(1000), black_box(47_500), black_box(&config)))
    });
}

fn bench_copy_frame(c: &mut Criterion) {
    let config = AudioStreamConfig::default();
    let mut device = SimulatedDevice::manual(&config);
    let handle = device.handle();
    let mut copier = SampleCopier::new(config);
    let samples = vec![1000i16; config.buffer_samples() * 2];

    // One frame's worth of lead, played back and refilled each iteration
    c.bench_function("copy_frame", |b| {
        b.iter(|| {
            handle.advance(config.latency_bytes());
            let plan = plan(handle.play_cursor(), copier.writer_index(), &config);
            let source = &samples[..plan.sample_count(&config) * 2];
            copier.write(&plan, black_box(source), &mut device)
        })
    });
}

criterion_group!(benches, bench_plan, bench_copy_frame);
criterion_main!(benches);
