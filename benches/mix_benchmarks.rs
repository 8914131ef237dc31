use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mysound_engine::audio::dsp_utils::sum_interleaved;
use mysound_engine::audio::handoff::Handoff;
use mysound_engine::audio::mixer::Mixer;
use mysound_engine::sound::effect::{Effect, FeedbackComb, FirFilter, Gain, SoftClip};
use mysound_engine::sound::signal::white_noise;
use mysound_engine::sound::Sound;

const WINDOW: usize = 512;

/// Window production for a single sound, including wraparound
fn bench_sound_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("sound_process");

    for len in [WINDOW * 8, WINDOW * 8 + 37, WINDOW / 2] {
        let mut sound = Sound::new(WINDOW, white_noise(len, 1));
        sound.play();
        let mut left = vec![0.0; WINDOW];
        let mut right = vec![0.0; WINDOW];

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(sound.process(&mut left, &mut right)));
        });
    }
    group.finish();
}

/// Full mix pass with increasing sound counts (critical for real-time)
fn bench_mix_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("mix_pass");

    for count in [1u64, 8, 32, 128] {
        let mut mixer = Mixer::new(WINDOW);
        for seed in 0..count {
            let id = mixer.add_sound(white_noise(WINDOW * 4 + seed as usize, seed));
            if let Some(sound) = mixer.sound_mut(id) {
                sound.add_effect(Box::new(Gain::new(0.1)));
                sound.play();
            }
        }
        mixer.add_post_effect(Box::new(SoftClip));

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                black_box(mixer.mix());
            });
        });
    }
    group.finish();
}

fn bench_effects(c: &mut Criterion) {
    let mut buffer = white_noise(2 * WINDOW, 3);

    c.bench_function("feedback_comb", |b| {
        let mut comb = FeedbackComb::new(2 * WINDOW, 0.5);
        b.iter(|| comb.process_block(black_box(&mut buffer)));
    });

    // 16-tap moving average, applied in place so it must stay bounded
    c.bench_function("fir_filter_16", |b| {
        let mut fir = FirFilter::with_block_len(vec![1.0 / 16.0; 16], 2 * WINDOW);
        b.iter(|| fir.process_block(black_box(&mut buffer)));
    });

    let left = white_noise(WINDOW, 4);
    let right = white_noise(WINDOW, 5);
    let mut mixed = vec![0.0; 2 * WINDOW];
    c.bench_function("sum_interleaved", |b| {
        b.iter(|| sum_interleaved(black_box(&mut mixed), &left, &right));
    });
}

/// Lock, copy and flag cost of one publish/service round
fn bench_handoff(c: &mut Criterion) {
    let handoff = Handoff::new(2 * WINDOW);
    let mixed = white_noise(2 * WINDOW, 6);
    let mut out = vec![0.0; 2 * WINDOW];

    c.bench_function("handoff_round_trip", |b| {
        b.iter(|| {
            handoff.publish(black_box(&mixed));
            black_box(handoff.service(&mut out));
        });
    });
}

criterion_group!(
    benches,
    bench_sound_process,
    bench_mix_pass,
    bench_effects,
    bench_handoff
);
criterion_main!(benches);
