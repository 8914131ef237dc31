// MySound Engine - Library exports for tests, benchmarks and the demo binary

pub mod audio;
pub mod sound;

// Re-export commonly used types for convenience
pub use audio::backend::{CpalBackend, DeviceStatus, ManualBackend, OutputBackend};
pub use audio::config::{EngineConfig, MixMode};
pub use audio::engine::AudioEngine;
pub use audio::error::{EngineError, EngineResult, LoadError};
pub use audio::export::{AudioExporter, ExportSettings, ExportSummary};
pub use audio::handoff::{Handoff, HandoffStats, ServiceOutcome};
pub use audio::load_monitor::{LoadLevel, LoadMonitor};
pub use audio::mixer::Mixer;
pub use sound::{Cursor, Effect, EffectChain, Sound, SoundId};
