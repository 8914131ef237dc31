// Sound - A monophonic clip instance with a windowed read cursor
//
// Each mix cycle a playing sound produces exactly one window of
// `window_length` samples. The cursor delimits that window inside the clip
// data, wrapping past the end of the clip back to index 0 when looping.
//
//   Stopped ──play()──▶ Playing { start <= end }   contiguous window
//                          │  ▲
//                 advance  ▼  │ advance
//                       Playing { start > end }    window wraps past len
//
// Any state goes back to `Stopped` on `stop()`, and a non-looping sound
// stops by itself after producing its last window.

use crate::sound::effect::{Effect, EffectChain};

/// Read cursor over the clip data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Stopped,
    /// Inclusive window bounds. `start > end` means the window wraps.
    Playing { start: usize, end: usize },
}

impl Cursor {
    pub fn is_wrapping(&self) -> bool {
        matches!(self, Cursor::Playing { start, end } if start > end)
    }
}

pub struct Sound {
    data: Vec<f32>,
    cursor: Cursor,
    looping: bool,
    paused: bool,
    effects: EffectChain,
    window_length: usize,
}

impl Sound {
    /// Create a stopped, looping sound producing windows of `window_length`
    pub fn new(window_length: usize, data: Vec<f32>) -> Self {
        debug_assert!(window_length > 0, "Window length must be positive");

        Self {
            data,
            cursor: Cursor::Stopped,
            looping: true,
            paused: false,
            effects: EffectChain::new(),
            window_length,
        }
    }

    /// Start playing from the beginning of the clip
    ///
    /// A clip shorter than the window plays in windows of its own length.
    /// An empty clip cannot play and stays stopped.
    pub fn play(&mut self) {
        let span = self.span();
        self.cursor = if span == 0 {
            Cursor::Stopped
        } else {
            Cursor::Playing {
                start: 0,
                end: span - 1,
            }
        };
    }

    pub fn stop(&mut self) {
        self.cursor = Cursor::Stopped;
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.cursor, Cursor::Playing { start, .. } if start < self.data.len())
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Replace the clip data. The sound is stopped since the old cursor may
    /// not fit the new data.
    pub fn set_data(&mut self, data: Vec<f32>) {
        self.data = data;
        self.cursor = Cursor::Stopped;
    }

    /// Append an effect to this sound's chain
    pub fn add_effect(&mut self, effect: Box<dyn Effect>) {
        self.effects.add_effect(effect);
    }

    pub fn remove_all_effects(&mut self) {
        self.effects.clear();
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn effects_mut(&mut self) -> &mut EffectChain {
        &mut self.effects
    }

    /// Number of samples a window covers inside the clip
    fn span(&self) -> usize {
        self.window_length.min(self.data.len())
    }

    /// Produce the next window into `out_left` / `out_right`
    ///
    /// Both outputs are zero-filled first, so a paused or stopped sound
    /// leaves silence. Returns `true` when the sound contributed audio.
    pub fn process(&mut self, out_left: &mut [f32], out_right: &mut [f32]) -> bool {
        debug_assert!(
            out_left.len() == self.window_length && out_right.len() == self.window_length,
            "Invalid buffer sizes"
        );

        out_left.fill(0.0);
        out_right.fill(0.0);

        if self.paused || !self.is_playing() {
            return false;
        }

        let Cursor::Playing { start, end } = self.cursor else {
            return false;
        };
        let len = self.data.len();
        debug_assert!(end < len, "Cursor end past clip data");

        if start > end {
            // Finish reading the tail of the clip
            let tail = len - start;
            out_left[..tail].copy_from_slice(&self.data[start..]);
            if self.looping {
                out_left[tail..tail + end + 1].copy_from_slice(&self.data[..=end]);
            }
        } else {
            out_left[..end - start + 1].copy_from_slice(&self.data[start..=end]);
        }

        self.effects.process_block(out_left);

        // Single input, duplicated to both channels
        out_right.copy_from_slice(out_left);

        self.advance();
        true
    }

    /// Move the cursor to the window following the current one
    fn advance(&mut self) {
        let Cursor::Playing { start, end } = self.cursor else {
            return;
        };
        let len = self.data.len();
        let span = self.span();

        if self.looping {
            // Happens when len is a multiple of the window: wrap back to 0
            let next_start = if end + 1 == len { 0 } else { end + 1 };

            let next_end = if next_start + span - 1 >= len {
                span - 1 - (len - next_start)
            } else {
                next_start + span - 1
            };

            self.cursor = Cursor::Playing {
                start: next_start,
                end: next_end,
            };
        } else if end + 1 == len || start > end {
            // Last window produced, or looping was switched off mid-wrap
            self.cursor = Cursor::Stopped;
        } else {
            let next_start = end + 1;
            self.cursor = Cursor::Playing {
                start: next_start,
                end: (next_start + span - 1).min(len - 1),
            };
        }

        debug_assert!(self.cursor_is_valid(), "Malformed cursor {:?}", self.cursor);
    }

    fn cursor_is_valid(&self) -> bool {
        match self.cursor {
            Cursor::Stopped => true,
            Cursor::Playing { start, end } => {
                let len = self.data.len();
                if start >= len || end >= len {
                    return false;
                }
                let covered = if start > end {
                    len - start + end + 1
                } else {
                    end - start + 1
                };
                // Final non-looping windows may be short
                covered == self.span() || (!self.looping && end == len - 1)
            }
        }
    }
}

impl Clone for Sound {
    /// Clones data and playback flags. Effects hold private state and are
    /// not cloned; the copy starts stopped with an empty chain.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            cursor: Cursor::Stopped,
            looping: self.looping,
            paused: self.paused,
            effects: EffectChain::new(),
            window_length: self.window_length,
        }
    }
}

impl std::fmt::Debug for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sound")
            .field("len", &self.data.len())
            .field("cursor", &self.cursor)
            .field("looping", &self.looping)
            .field("paused", &self.paused)
            .field("effects", &self.effects)
            .field("window_length", &self.window_length)
            .finish()
    }
}
