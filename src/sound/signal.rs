// Test signal generators
//
// Deterministic for a given seed. Each call owns its generator, so two calls
// with the same seed return the same signal.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform white noise in [-1, 1]
pub fn white_noise(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..=1.0)).collect()
}

/// Normally distributed white noise (mean 0, standard deviation 1)
///
/// Box-Muller transform, two samples per pair of uniforms.
pub fn gaussian_white_noise(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len);

    while out.len() < len {
        // u1 in (0, 1] so ln() stays finite
        let u1: f32 = 1.0 - rng.r#gen::<f32>();
        let u2: f32 = rng.r#gen::<f32>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = std::f32::consts::TAU * u2;

        out.push(radius * angle.cos());
        if out.len() < len {
            out.push(radius * angle.sin());
        }
    }

    out
}

/// Sine tone, handy for demos and tests
pub fn sine(len: usize, frequency: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    let step = std::f32::consts::TAU * frequency / sample_rate as f32;
    (0..len)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect()
}
