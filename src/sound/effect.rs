// Effect - Block effect architecture for per-sound and post-process chains
//
// Effects transform a whole buffer in place. The same trait is used for the
// per-sound chain (mono window) and the engine's post-process chain
// (interleaved stereo mix).
//
// Real-time constraints:
// - No allocations in `process_block()`
// - No blocking operations
// - State lives inside the effect, never in statics

use crate::audio::dsp_utils::{flush_denormals_to_zero, hard_clip, soft_clip};

/// Generic block effect
pub trait Effect: Send {
    /// Transform `buffer` in place
    fn process_block(&mut self, buffer: &mut [f32]);

    /// Clear internal state (feedback memories, etc.)
    fn reset(&mut self) {}

    /// Disabled effects are bypassed by the chain
    fn is_enabled(&self) -> bool {
        true
    }

    fn set_enabled(&mut self, _enabled: bool) {}

    fn name(&self) -> &str;
}

/// Ordered chain of effects, applied in insertion order
#[derive(Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Pre-allocate room for `capacity` effects
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            effects: Vec::with_capacity(capacity),
        }
    }

    pub fn add_effect(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    /// Remove an effect by index, `None` if out of bounds
    pub fn remove_effect(&mut self, index: usize) -> Option<Box<dyn Effect>> {
        if index < self.effects.len() {
            Some(self.effects.remove(index))
        } else {
            None
        }
    }

    pub fn get_effect_mut(&mut self, index: usize) -> Option<&mut Box<dyn Effect>> {
        self.effects.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.effects.iter().map(|e| e.name().to_string()).collect()
    }

    /// Run `buffer` through every enabled effect, in order
    #[inline]
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for effect in &mut self.effects {
            if effect.is_enabled() {
                effect.process_block(buffer);
            }
        }
    }

    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.effects.iter().map(|e| e.name()))
            .finish()
    }
}

/// Linear gain
pub struct Gain {
    gain: f32,
    enabled: bool,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self {
            gain,
            enabled: true,
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Effect for Gain {
    fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample *= self.gain;
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn name(&self) -> &str {
        "Gain"
    }
}

/// Strict clamp to [-1, 1]
#[derive(Default)]
pub struct HardClip;

impl Effect for HardClip {
    fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = hard_clip(*sample);
        }
    }

    fn name(&self) -> &str {
        "HardClip"
    }
}

/// tanh saturation
#[derive(Default)]
pub struct SoftClip;

impl Effect for SoftClip {
    fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = soft_clip(*sample);
        }
    }

    fn name(&self) -> &str {
        "SoftClip"
    }
}

/// Block feedback comb
///
/// Each output sample is the input plus the attenuated output found at the
/// same position of the previous block: `y[i] = x[i] + g * y_prev[i]`.
/// The delay therefore equals the block length. `g` is clamped to [0, 0.999].
pub struct FeedbackComb {
    memory: Vec<f32>,
    attenuation: f32,
    enabled: bool,
}

impl FeedbackComb {
    /// `block_len` is the length of the buffers this effect will see
    pub fn new(block_len: usize, attenuation: f32) -> Self {
        Self {
            memory: vec![0.0; block_len],
            attenuation: attenuation.clamp(0.0, 0.999),
            enabled: true,
        }
    }

    pub fn attenuation(&self) -> f32 {
        self.attenuation
    }
}

impl Effect for FeedbackComb {
    fn process_block(&mut self, buffer: &mut [f32]) {
        // Buffers of another size get a fresh memory rather than a partial one
        if self.memory.len() != buffer.len() {
            self.memory.clear();
            self.memory.resize(buffer.len(), 0.0);
        }

        for (sample, last) in buffer.iter_mut().zip(self.memory.iter_mut()) {
            *last = flush_denormals_to_zero(*sample + *last * self.attenuation);
            *sample = *last;
        }
    }

    fn reset(&mut self) {
        self.memory.iter_mut().for_each(|m| *m = 0.0);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    fn name(&self) -> &str {
        "FeedbackComb"
    }
}

/// Block FIR filter
///
/// `y[k] = sum(taps[n] * x[k + n])` over the taps whose input index stays
/// inside the block. Inputs past the end of the block count as zero, and
/// nothing is carried over to the next block.
pub struct FirFilter {
    taps: Vec<f32>,
    // Copy of the input, the output is written over the buffer itself
    scratch: Vec<f32>,
    enabled: bool,
}

impl FirFilter {
    pub fn new(taps: Vec<f32>) -> Self {
        Self {
            taps,
            scratch: Vec::new(),
            enabled: true,
        }
    }

    /// Like `new`, with the scratch sized for blocks of `block_len`
    pub fn with_block_len(taps: Vec<f32>, block_len: usize) -> Self {
        Self {
            taps,
            scratch: vec![0.0; block_len],
            enabled: true,
        }
    }

    pub fn taps(&self) -> &[f32] {
        &self.taps
    }
}

impl Effect for FirFilter {
    fn process_block(&mut self, buffer: &mut [f32]) {
        let len = buffer.len();
        if self.scratch.len() != len {
            self.scratch.resize(len, 0.0);
        }
        self.scratch.copy_from_slice(buffer);

        for (k, out) in buffer.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (n, &tap) in self.taps.iter().enumerate() {
                if k + n >= len {
                    break;
                }
                acc += self.scratch[k + n] * tap;
            }
            *out = acc;
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn name(&self) -> &str {
        "FirFilter"
    }
}

/// Wraps a closure as an effect
///
/// ```
/// use mysound_engine::sound::effect::{Effect, FnEffect};
///
/// let mut invert = FnEffect::new("Invert", |buffer: &mut [f32]| {
///     buffer.iter_mut().for_each(|s| *s = -*s);
/// });
/// let mut block = [0.5, -0.25];
/// invert.process_block(&mut block);
/// assert_eq!(block, [-0.5, 0.25]);
/// ```
pub struct FnEffect<F> {
    name: String,
    f: F,
    enabled: bool,
}

impl<F> FnEffect<F>
where
    F: FnMut(&mut [f32]) + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            enabled: true,
        }
    }
}

impl<F> Effect for FnEffect<F>
where
    F: FnMut(&mut [f32]) + Send,
{
    fn process_block(&mut self, buffer: &mut [f32]) {
        (self.f)(buffer);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
