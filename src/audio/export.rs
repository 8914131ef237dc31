// Audio Export - Offline rendering of the mix to WAV files
//
// Unlike the real-time path, export plays both sides of the handoff itself:
// one mix pass, then one hardware service, per window, as fast as possible.
// This only works on an engine with a `ManualBackend` in polled mode,
// otherwise another party would be consuming the same buffers.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::config::MixMode;
use crate::audio::engine::AudioEngine;
use crate::audio::error::{EngineError, EngineResult};
use crate::audio::format_conversion::f32_to_i16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// 16 (integer PCM) or 32 (float)
    pub bit_depth: u16,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { bit_depth: 32 }
    }
}

impl ExportSettings {
    pub fn pcm16() -> Self {
        Self { bit_depth: 16 }
    }

    fn wav_spec(&self, sample_rate: u32) -> EngineResult<WavSpec> {
        let sample_format = match self.bit_depth {
            16 => SampleFormat::Int,
            32 => SampleFormat::Float,
            other => {
                return Err(EngineError::Export(format!(
                    "Unsupported bit depth {} (expected 16 or 32)",
                    other
                )));
            }
        };

        Ok(WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format,
        })
    }
}

/// Result of a finished export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Stereo frames written
    pub frames: u64,
    /// Windows rendered
    pub cycles: usize,
}

/// Renders an engine's output to a file
#[derive(Debug, Clone, Default)]
pub struct AudioExporter {
    settings: ExportSettings,
}

impl AudioExporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Render `cycles` windows of the engine's mix into a stereo WAV file
    pub fn render_to_wav(
        &self,
        engine: &AudioEngine,
        path: impl AsRef<Path>,
        cycles: usize,
    ) -> EngineResult<ExportSummary> {
        self.render_to_wav_with_progress(engine, path, cycles, |_| {})
    }

    /// Same as `render_to_wav`, reporting progress from 0.0 to 1.0
    pub fn render_to_wav_with_progress(
        &self,
        engine: &AudioEngine,
        path: impl AsRef<Path>,
        cycles: usize,
        mut progress: impl FnMut(f32),
    ) -> EngineResult<ExportSummary> {
        if !engine.is_manual() {
            return Err(EngineError::Export(format!(
                "Offline render needs a manual backend, engine uses {}",
                engine.backend_name()
            )));
        }
        if engine.mix_mode() != MixMode::Polled {
            return Err(EngineError::Export(
                "Offline render needs polled mixing".to_string(),
            ));
        }

        let path = path.as_ref();
        let spec = self.settings.wav_spec(engine.sample_rate())?;
        let mut writer = WavWriter::create(path, spec)?;

        log::info!(
            "Exporting {} windows ({} frames) to {}",
            cycles,
            cycles * engine.window_length(),
            path.display()
        );

        let mut buffer = vec![0.0f32; 2 * engine.window_length()];
        // Report roughly once per second of audio
        let report_every = (engine.sample_rate() as usize / engine.window_length()).max(1);

        for cycle in 0..cycles {
            engine.process_audio();
            engine.service_hardware(&mut buffer);

            match spec.sample_format {
                SampleFormat::Float => {
                    for &sample in &buffer {
                        writer.write_sample(sample)?;
                    }
                }
                SampleFormat::Int => {
                    for &sample in &buffer {
                        writer.write_sample(f32_to_i16(sample))?;
                    }
                }
            }

            if cycle % report_every == 0 {
                progress(cycle as f32 / cycles as f32);
            }
        }

        writer.finalize()?;
        progress(1.0);

        let summary = ExportSummary {
            frames: (cycles * engine.window_length()) as u64,
            cycles,
        };
        log::info!("Export finished: {} frames", summary.frames);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_spec_for_bit_depths() {
        let float = ExportSettings::default().wav_spec(48000).unwrap();
        assert_eq!(float.sample_format, SampleFormat::Float);
        assert_eq!(float.bits_per_sample, 32);
        assert_eq!(float.channels, 2);

        let int = ExportSettings::pcm16().wav_spec(44100).unwrap();
        assert_eq!(int.sample_format, SampleFormat::Int);
        assert_eq!(int.sample_rate, 44100);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let settings = ExportSettings { bit_depth: 24 };
        assert!(matches!(
            settings.wav_spec(48000),
            Err(EngineError::Export(_))
        ));
    }
}
