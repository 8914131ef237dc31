// Mixer - Owned sound collection and the mix pass
//
// The mixer owns every sound, the post-process chain and all scratch
// buffers. A mix pass sums the current window of each sound into a private
// interleaved stereo buffer, then runs the post-process chain on it. The
// result is published to the hardware side by the engine through `Handoff`.

use crate::audio::dsp_utils::{peak, sum_interleaved};
use crate::sound::effect::{Effect, EffectChain};
use crate::sound::{Sound, SoundId};

pub struct Mixer {
    window_length: usize,
    sounds: Vec<(SoundId, Sound)>,
    next_id: u64,
    post_effects: EffectChain,
    last_peak: f32,

    // Scratch, allocated once
    left: Vec<f32>,
    right: Vec<f32>,
    mixed: Vec<f32>,
}

impl Mixer {
    pub fn new(window_length: usize) -> Self {
        Self {
            window_length,
            sounds: Vec::new(),
            next_id: 0,
            post_effects: EffectChain::new(),
            last_peak: 0.0,
            left: vec![0.0; window_length],
            right: vec![0.0; window_length],
            mixed: vec![0.0; 2 * window_length],
        }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Take ownership of a new sound built from `data`
    pub fn add_sound(&mut self, data: Vec<f32>) -> SoundId {
        let id = SoundId(self.next_id);
        self.next_id += 1;
        self.sounds.push((id, Sound::new(self.window_length, data)));
        id
    }

    /// Copy the data and flags of an existing sound into a new one
    pub fn duplicate_sound(&mut self, id: SoundId) -> Option<SoundId> {
        let copy = self.sound(id)?.clone();
        let new_id = SoundId(self.next_id);
        self.next_id += 1;
        self.sounds.push((new_id, copy));
        Some(new_id)
    }

    pub fn remove_sound(&mut self, id: SoundId) -> Option<Sound> {
        let index = self.sounds.iter().position(|(sid, _)| *sid == id)?;
        Some(self.sounds.remove(index).1)
    }

    pub fn clear_sounds(&mut self) {
        self.sounds.clear();
    }

    pub fn sound(&self, id: SoundId) -> Option<&Sound> {
        self.sounds
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, sound)| sound)
    }

    pub fn sound_mut(&mut self, id: SoundId) -> Option<&mut Sound> {
        self.sounds
            .iter_mut()
            .find(|(sid, _)| *sid == id)
            .map(|(_, sound)| sound)
    }

    pub fn sound_ids(&self) -> Vec<SoundId> {
        self.sounds.iter().map(|(id, _)| *id).collect()
    }

    pub fn sound_count(&self) -> usize {
        self.sounds.len()
    }

    pub fn playing_count(&self) -> usize {
        self.sounds.iter().filter(|(_, s)| s.is_playing()).count()
    }

    pub fn stop_all(&mut self) {
        for (_, sound) in &mut self.sounds {
            sound.stop();
        }
    }

    /// Append a transform applied to the whole interleaved mix
    pub fn add_post_effect(&mut self, effect: Box<dyn Effect>) {
        self.post_effects.add_effect(effect);
    }

    pub fn clear_post_effects(&mut self) {
        self.post_effects.clear();
    }

    pub fn post_effect_count(&self) -> usize {
        self.post_effects.len()
    }

    /// Peak absolute sample of the last mix, after post effects
    pub fn last_peak(&self) -> f32 {
        self.last_peak
    }

    /// Run one mix pass and return the interleaved stereo result
    ///
    /// The returned slice is `2 * window_length` long and stays valid until
    /// the next call.
    pub fn mix(&mut self) -> &[f32] {
        self.mixed.fill(0.0);

        for (_, sound) in &mut self.sounds {
            if sound.process(&mut self.left, &mut self.right) {
                sum_interleaved(&mut self.mixed, &self.left, &self.right);
            }
        }

        self.post_effects.process_block(&mut self.mixed);
        self.last_peak = peak(&self.mixed);

        &self.mixed
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("window_length", &self.window_length)
            .field("sounds", &self.sounds.len())
            .field("post_effects", &self.post_effects)
            .finish()
    }
}
