pub mod effect;
pub mod loader;
pub mod signal;
#[allow(clippy::module_inception)]
pub mod sound;

pub use effect::{
    Effect, EffectChain, FeedbackComb, FirFilter, FnEffect, Gain, HardClip, SoftClip,
};
pub use loader::{DecodedAudio, load_audio};
pub use sound::{Cursor, Sound};

use std::fmt;

/// Stable handle to a sound owned by the engine
///
/// Ids are never reused, so a handle to a destroyed sound stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub(crate) u64);

impl SoundId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}
