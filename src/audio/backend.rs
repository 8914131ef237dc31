// Output backends - who calls the hardware side of the handoff
//
// The engine does not talk to audio hardware directly. A backend receives
// the shared `Handoff` on start and services it at its own cadence:
//
// - `CpalBackend` opens a cpal output stream; the device callback services
//   the handoff whenever its local copy of the front buffer runs dry.
// - `ManualBackend` opens nothing. The owner plays the hardware role by
//   calling `AudioEngine::service_hardware` (tests, offline rendering,
//   hosts that already own an audio callback).
//
// # Stream Limitations
//
// On macOS (CoreAudio) the cpal `Stream` is neither Send nor Sync, so a
// `CpalBackend` (and an engine owning one) stays on the thread that built it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, FromSample, Host, SampleFormat, SampleRate, SizedSample, Stream,
    StreamConfig,
};

use crate::audio::config::EngineConfig;
use crate::audio::error::{EngineError, EngineResult};
use crate::audio::format_conversion::write_stereo_to_interleaved_frame;
use crate::audio::handoff::Handoff;

/// Owner of the hardware-driven side of the handoff
pub trait OutputBackend {
    /// Open and start the output. Failures are fatal for the engine.
    fn start(&mut self, handoff: Arc<Handoff>) -> EngineResult<()>;

    /// Stop and close the output
    fn stop(&mut self) -> EngineResult<()>;

    fn name(&self) -> &str;

    /// Current state of the output
    fn status(&self) -> DeviceStatus;

    /// Whether the owner must service the handoff itself
    fn is_manual(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Error = 3,
}

impl From<u8> for DeviceStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => DeviceStatus::Connecting,
            2 => DeviceStatus::Connected,
            3 => DeviceStatus::Error,
            _ => DeviceStatus::Disconnected,
        }
    }
}

/// Device status shared with the stream's error callback
#[derive(Clone)]
pub struct AtomicDeviceStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicDeviceStatus {
    pub fn new(status: DeviceStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> DeviceStatus {
        DeviceStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: DeviceStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicDeviceStatus {
    fn default() -> Self {
        Self::new(DeviceStatus::Disconnected)
    }
}

/// Backend without hardware; see module docs
#[derive(Debug, Default)]
pub struct ManualBackend {
    running: bool,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl OutputBackend for ManualBackend {
    fn start(&mut self, _handoff: Arc<Handoff>) -> EngineResult<()> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> EngineResult<()> {
        self.running = false;
        Ok(())
    }

    fn name(&self) -> &str {
        "manual"
    }

    fn status(&self) -> DeviceStatus {
        if self.running {
            DeviceStatus::Connected
        } else {
            DeviceStatus::Disconnected
        }
    }

    fn is_manual(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List every output device of the default host
pub fn list_output_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let mut devices = Vec::new();
    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                devices.push(AudioDeviceInfo {
                    is_default: name == default_name,
                    name,
                });
            }
        }
    }
    devices
}

/// Stereo cpal output stream at a fixed buffer size
pub struct CpalBackend {
    sample_rate: u32,
    window_length: usize,
    device_name: Option<String>,
    stream: Option<Stream>,
    status: AtomicDeviceStatus,
    name: String,
}

impl CpalBackend {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            window_length: config.window_length,
            device_name: config.device_name.clone(),
            stream: None,
            status: AtomicDeviceStatus::default(),
            name: "cpal".to_string(),
        }
    }

    fn select_device(&self, host: &Host) -> EngineResult<Device> {
        match &self.device_name {
            None => host.default_output_device().ok_or(EngineError::NoDevice),
            Some(wanted) => host
                .output_devices()
                .map_err(|e| EngineError::DeviceConfig(e.to_string()))?
                .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                .ok_or_else(|| EngineError::DeviceNotFound(wanted.clone())),
        }
    }

    /// Build a stream for the device's native sample type
    ///
    /// The callback keeps a local copy of the front buffer and services the
    /// handoff each time it has been fully written out, so device buffers of
    /// any size are served without blocking or allocating.
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        handoff: Arc<Handoff>,
        status: AtomicDeviceStatus,
    ) -> EngineResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = config.channels as usize;
        let mut local = vec![0.0f32; handoff.buffer_len()];
        let mut position = local.len();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // ========== REAL-TIME ZONE ==========
                // No allocations, no I/O, no blocking locks
                for frame in data.chunks_mut(channels) {
                    if position >= local.len() {
                        // On contention `local` still holds the last window
                        handoff.service(&mut local);
                        position = 0;
                    }
                    write_stereo_to_interleaved_frame(
                        (local[position], local[position + 1]),
                        frame,
                    );
                    position += 2;
                }
                // ========== REAL-TIME ZONE END ==========
            },
            move |err| {
                // Runs outside the audio path
                log::error!("Audio stream error: {}", err);
                status.set(DeviceStatus::Error);
            },
            None,
        )?;

        Ok(stream)
    }
}

impl OutputBackend for CpalBackend {
    fn start(&mut self, handoff: Arc<Handoff>) -> EngineResult<()> {
        self.status.set(DeviceStatus::Connecting);

        let host = cpal::default_host();
        let device = self.select_device(&host)?;
        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| EngineError::DeviceConfig(e.to_string()))?;
        let sample_format = supported_config.sample_format();

        let config = StreamConfig {
            channels: 2,
            sample_rate: SampleRate(self.sample_rate),
            buffer_size: BufferSize::Fixed(self.window_length as u32),
        };
        log::debug!("Stream config: {:?}, sample format {:?}", config, sample_format);

        let status = self.status.clone();
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, handoff, status),
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, handoff, status),
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, handoff, status),
            other => Err(EngineError::UnsupportedSampleFormat(format!(
                "{:?} (supported: F32, I16, U16)",
                other
            ))),
        }
        .inspect_err(|_| self.status.set(DeviceStatus::Error))?;

        stream.play()?;
        self.status.set(DeviceStatus::Connected);
        self.stream = Some(stream);

        log::info!(
            "Output stream started: {} Hz, {} frames per buffer",
            self.sample_rate,
            self.window_length
        );
        Ok(())
    }

    fn stop(&mut self) -> EngineResult<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        self.status.set(DeviceStatus::Disconnected);
        // Dropping the stream closes it, even when pausing failed
        stream.pause()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Updated from the stream's error callback
    fn status(&self) -> DeviceStatus {
        self.status.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_status_round_trip() {
        let status = AtomicDeviceStatus::default();
        assert_eq!(status.get(), DeviceStatus::Disconnected);

        let shared = status.clone();
        shared.set(DeviceStatus::Connected);
        assert_eq!(status.get(), DeviceStatus::Connected);

        assert_eq!(DeviceStatus::from(3), DeviceStatus::Error);
        assert_eq!(DeviceStatus::from(42), DeviceStatus::Disconnected);
    }

    #[test]
    fn test_manual_backend_lifecycle() {
        let mut backend = ManualBackend::new();
        assert!(backend.is_manual());
        assert!(!backend.is_running());
        assert_eq!(backend.status(), DeviceStatus::Disconnected);

        backend.start(Arc::new(Handoff::new(4))).unwrap();
        assert!(backend.is_running());
        assert_eq!(backend.status(), DeviceStatus::Connected);

        backend.stop().unwrap();
        assert!(!backend.is_running());
        assert_eq!(backend.status(), DeviceStatus::Disconnected);
        assert_eq!(backend.name(), "manual");
    }

    #[test]
    fn test_cpal_backend_stop_without_start() {
        let mut backend = CpalBackend::new(&EngineConfig::default());
        assert!(backend.stop().is_ok());
        assert_eq!(backend.status(), DeviceStatus::Disconnected);
    }
}
