// Error types for the engine and the asset loader

use std::path::PathBuf;

use thiserror::Error;

use crate::sound::SoundId;

/// Errors raised while decoding an audio file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("FLAC decode error: {0}")]
    Flac(#[from] claxon::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No decodable audio track in {0}")]
    NoTracks(PathBuf),

    #[error("File contains no audio: {0}")]
    Empty(PathBuf),
}

/// Engine errors
///
/// Device and stream failures are fatal at construction. Teardown failures
/// are only logged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Output device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device configuration error: {0}")]
    DeviceConfig(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Error in stream creation: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Error starting stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Error stopping stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("Unknown sound: {0}")]
    UnknownSound(SoundId),

    #[error("Failed to load sound: {0}")]
    Load(#[from] LoadError),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mix worker failed to start: {0}")]
    Worker(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<hound::Error> for EngineError {
    fn from(err: hound::Error) -> Self {
        EngineError::Export(err.to_string())
    }
}
