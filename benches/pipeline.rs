use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slowreverb::audio::{self, change_speed, AudioBuffer};
use slowreverb::effects::{apply_reverb, ReverbSettings};
use slowreverb::processing::{process, EffectParameters};

fn stereo_tone(seconds: f32) -> AudioBuffer {
    let sample_rate = 44100;
    let frames = (sample_rate as f32 * seconds) as usize;
    let interleaved: Vec<f32> = (0..frames * 2)
        .map(|i| ((i / 2) as f32 * 0.02).sin() * 0.5)
        .collect();
    AudioBuffer::from_interleaved(sample_rate, 2, &interleaved).unwrap()
}

fn bench_stages(c: &mut Criterion) {
    let buffer = stereo_tone(5.0);
    let settings = ReverbSettings::default();

    c.bench_function("change_speed 5s stereo", |b| {
        b.iter(|| change_speed(black_box(&buffer), 0.85).unwrap())
    });

    c.bench_function("apply_reverb 5s stereo", |b| {
        b.iter(|| apply_reverb(black_box(&buffer), &settings).unwrap())
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let input = audio::encode(&stereo_tone(5.0)).unwrap();
    let params = EffectParameters::default();

    c.bench_function("process 5s stereo wav", |b| {
        b.iter(|| process(black_box(&input), &params).unwrap())
    });
}

criterion_group!(benches, bench_stages, bench_pipeline);
criterion_main!(benches);
