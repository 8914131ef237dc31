// Engine configuration
//
// Sample rate and window length are fixed for the lifetime of an engine.
// Configurations can be written by hand in RON:
//
// ```ron
// (
//     sample_rate: 44100,
//     window_length: 256,
//     mix_mode: Worker,
// )
// ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::error::{EngineError, EngineResult};

/// Where the mix pass runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MixMode {
    /// The owner calls `AudioEngine::process_audio` from its own loop
    #[default]
    Polled,
    /// A dedicated thread mixes whenever the hardware asks for a buffer
    Worker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Samples per mono channel per hardware cycle
    pub window_length: usize,
    pub mix_mode: MixMode,
    /// Output device name, `None` selects the host default
    pub device_name: Option<String>,
    /// Measure 1 out of N mix passes
    pub load_measure_every: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            window_length: 512,
            mix_mode: MixMode::Polled,
            device_name: None,
            load_measure_every: 10,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: u32, window_length: usize) -> Self {
        Self {
            sample_rate,
            window_length,
            ..Self::default()
        }
    }

    pub fn with_mix_mode(mut self, mix_mode: MixMode) -> Self {
        self.mix_mode = mix_mode;
        self
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Parse a RON document, then validate it
    pub fn from_ron_str(source: &str) -> EngineResult<Self> {
        let config: EngineConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> EngineResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::InvalidConfig(
                "sample_rate must be positive".to_string(),
            ));
        }
        if self.window_length == 0 {
            return Err(EngineError::InvalidConfig(
                "window_length must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Length of one interleaved stereo buffer
    pub fn stereo_len(&self) -> usize {
        2 * self.window_length
    }

    /// Duration of one hardware cycle
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.window_length as f64 / self.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stereo_len(), 1024);
    }

    #[test]
    fn test_parse_partial_ron() {
        let config = EngineConfig::from_ron_str("(sample_rate: 44100, mix_mode: Worker)").unwrap();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.window_length, 512);
        assert_eq!(config.mix_mode, MixMode::Worker);
        assert_eq!(config.device_name, None);
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = EngineConfig::from_ron_str("(window_length: 0)");
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_period() {
        let config = EngineConfig::new(48000, 480);
        assert_eq!(config.period().as_millis(), 10);
    }
}
