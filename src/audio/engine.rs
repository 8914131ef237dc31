// Audio engine - sound collection, mix pass and hardware handoff
//
// The engine owns three shared pieces:
//
// - `Mixer` behind its own mutex: sounds, post-process chain, scratch.
//   Structural changes (create/destroy) and mix passes are serialized by it.
// - `Handoff`: the front/back buffers and the "needs processing" flag. The
//   hardware side only ever touches this one, with `try_lock`.
// - An `OutputBackend` that drives the hardware side.
//
// Lock order is always mixer then handoff. The hardware side never takes the
// mixer lock, so it cannot wait on a mix pass.
//
// # Mix modes
//
// - `MixMode::Polled`: the owner calls `process_audio()` from its loop.
// - `MixMode::Worker`: a `mix-worker` thread sleeps on the handoff's
//   condition variable and mixes whenever a buffer is requested.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::backend::{CpalBackend, DeviceStatus, ManualBackend, OutputBackend};
use crate::audio::config::{EngineConfig, MixMode};
use crate::audio::error::{EngineError, EngineResult};
use crate::audio::handoff::{Handoff, HandoffStats, ServiceOutcome};
use crate::audio::load_monitor::LoadMonitor;
use crate::audio::mixer::Mixer;
use crate::sound::effect::Effect;
use crate::sound::loader::load_audio;
use crate::sound::{Sound, SoundId};

pub struct AudioEngine {
    config: EngineConfig,
    mixer: Arc<Mutex<Mixer>>,
    handoff: Arc<Handoff>,
    load_monitor: LoadMonitor,
    worker: Option<MixWorker>,
    backend: Box<dyn OutputBackend>,
}

impl AudioEngine {
    /// Open the configured cpal output device and start playback
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let backend = CpalBackend::new(&config);
        Self::with_backend(config, Box::new(backend))
    }

    /// Engine whose hardware side is driven by `service_hardware`
    pub fn manual(config: EngineConfig) -> EngineResult<Self> {
        Self::with_backend(config, Box::new(ManualBackend::new()))
    }

    pub fn with_backend(
        config: EngineConfig,
        backend: Box<dyn OutputBackend>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let mixer = Arc::new(Mutex::new(Mixer::new(config.window_length)));
        let handoff = Arc::new(Handoff::new(config.stereo_len()));
        let load_monitor = LoadMonitor::new(config.period(), config.load_measure_every);

        let mut engine = Self {
            config,
            mixer,
            handoff,
            load_monitor,
            worker: None,
            backend,
        };

        // On error the partially built engine is dropped, which stops
        // whatever was already running
        if engine.config.mix_mode == MixMode::Worker {
            engine.worker = Some(MixWorker::spawn(
                Arc::clone(&engine.mixer),
                Arc::clone(&engine.handoff),
                engine.load_monitor.clone(),
                engine.config.period(),
            )?);
        }
        engine.backend.start(Arc::clone(&engine.handoff))?;

        log::info!(
            "Audio engine started: {} Hz, window {}, {:?} mixing, {} output",
            engine.config.sample_rate,
            engine.config.window_length,
            engine.config.mix_mode,
            engine.backend.name()
        );

        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn window_length(&self) -> usize {
        self.config.window_length
    }

    pub fn mix_mode(&self) -> MixMode {
        self.config.mix_mode
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn device_status(&self) -> DeviceStatus {
        self.backend.status()
    }

    /// Whether the owner drives the hardware side through `service_hardware`
    pub fn is_manual(&self) -> bool {
        self.backend.is_manual()
    }

    pub fn handoff_stats(&self) -> &HandoffStats {
        self.handoff.stats()
    }

    pub fn load_monitor(&self) -> &LoadMonitor {
        &self.load_monitor
    }

    /// Peak absolute sample of the last published mix
    pub fn output_peak(&self) -> f32 {
        self.lock_mixer().last_peak()
    }

    fn lock_mixer(&self) -> MutexGuard<'_, Mixer> {
        lock_mixer(&self.mixer)
    }

    fn sound_op<R>(&self, id: SoundId, f: impl FnOnce(&mut Sound) -> R) -> EngineResult<R> {
        let mut mixer = self.lock_mixer();
        mixer
            .sound_mut(id)
            .map(f)
            .ok_or(EngineError::UnknownSound(id))
    }

    // ---------------------------------------------------------------
    // Sound collection
    // ---------------------------------------------------------------

    /// Create a stopped sound from a copy of `data`
    pub fn create_sound(&self, data: &[f32]) -> SoundId {
        let id = self.lock_mixer().add_sound(data.to_vec());
        log::debug!("Created {} ({} samples)", id, data.len());
        id
    }

    /// Decode an audio file and create a stopped sound from it
    ///
    /// Multichannel files are folded down to mono. No resampling happens, so
    /// a file at another rate plays back at the wrong pitch.
    pub fn create_sound_from_file(&self, path: impl AsRef<Path>) -> EngineResult<SoundId> {
        let path = path.as_ref();
        let decoded = load_audio(path)?;

        if decoded.sample_rate != self.config.sample_rate {
            log::warn!(
                "{} is {} Hz but the engine runs at {} Hz; it will play at the wrong speed",
                path.display(),
                decoded.sample_rate,
                self.config.sample_rate
            );
        }

        let id = self.lock_mixer().add_sound(decoded.to_mono());
        log::debug!(
            "Created {} from {} ({} frames, {} channels)",
            id,
            path.display(),
            decoded.frames(),
            decoded.channels
        );
        Ok(id)
    }

    /// New stopped sound with the same data and flags, without effects
    pub fn duplicate_sound(&self, id: SoundId) -> EngineResult<SoundId> {
        let new_id = self
            .lock_mixer()
            .duplicate_sound(id)
            .ok_or(EngineError::UnknownSound(id))?;
        log::debug!("Duplicated {} as {}", id, new_id);
        Ok(new_id)
    }

    pub fn destroy_sound(&self, id: SoundId) -> EngineResult<()> {
        self.lock_mixer()
            .remove_sound(id)
            .ok_or(EngineError::UnknownSound(id))?;
        log::debug!("Destroyed {}", id);
        Ok(())
    }

    pub fn destroy_all(&self) {
        let mut mixer = self.lock_mixer();
        let count = mixer.sound_count();
        mixer.clear_sounds();
        log::debug!("Destroyed all {} sounds", count);
    }

    pub fn stop_all(&self) {
        self.lock_mixer().stop_all();
    }

    pub fn sound_ids(&self) -> Vec<SoundId> {
        self.lock_mixer().sound_ids()
    }

    pub fn sound_count(&self) -> usize {
        self.lock_mixer().sound_count()
    }

    pub fn playing_count(&self) -> usize {
        self.lock_mixer().playing_count()
    }

    // ---------------------------------------------------------------
    // Per-sound control
    // ---------------------------------------------------------------

    pub fn play(&self, id: SoundId) -> EngineResult<()> {
        self.sound_op(id, Sound::play)
    }

    pub fn stop(&self, id: SoundId) -> EngineResult<()> {
        self.sound_op(id, Sound::stop)
    }

    pub fn is_playing(&self, id: SoundId) -> EngineResult<bool> {
        self.sound_op(id, |sound| sound.is_playing())
    }

    pub fn set_looping(&self, id: SoundId, looping: bool) -> EngineResult<()> {
        self.sound_op(id, |sound| sound.set_looping(looping))
    }

    pub fn set_paused(&self, id: SoundId, paused: bool) -> EngineResult<()> {
        self.sound_op(id, |sound| sound.set_paused(paused))
    }

    /// Append an effect to the end of a sound's chain
    pub fn add_effect(&self, id: SoundId, effect: Box<dyn Effect>) -> EngineResult<()> {
        self.sound_op(id, |sound| sound.add_effect(effect))
    }

    pub fn remove_all_effects(&self, id: SoundId) -> EngineResult<()> {
        self.sound_op(id, Sound::remove_all_effects)
    }

    /// Run `f` on a sound while holding the mixer lock
    pub fn with_sound<R>(&self, id: SoundId, f: impl FnOnce(&Sound) -> R) -> EngineResult<R> {
        let mixer = self.lock_mixer();
        mixer.sound(id).map(f).ok_or(EngineError::UnknownSound(id))
    }

    /// Mutable variant of `with_sound`. Keep `f` short, it delays mixing.
    pub fn with_sound_mut<R>(
        &self,
        id: SoundId,
        f: impl FnOnce(&mut Sound) -> R,
    ) -> EngineResult<R> {
        self.sound_op(id, f)
    }

    // ---------------------------------------------------------------
    // Post-process chain
    // ---------------------------------------------------------------

    /// Append a transform applied to every mixed interleaved buffer
    pub fn add_post_effect(&self, effect: Box<dyn Effect>) {
        self.lock_mixer().add_post_effect(effect);
    }

    pub fn clear_post_effects(&self) {
        self.lock_mixer().clear_post_effects();
    }

    // ---------------------------------------------------------------
    // Mixing and hardware handoff
    // ---------------------------------------------------------------

    /// Mix and publish one window if the hardware asked for one
    ///
    /// Returns whether a buffer was published. In worker mode the worker
    /// owns mixing and this always returns `false`.
    pub fn process_audio(&self) -> bool {
        if self.worker.is_some() || !self.handoff.needs_processing() {
            return false;
        }
        run_mix_pass(&self.mixer, &self.handoff, &self.load_monitor);
        true
    }

    /// Hardware side of the handoff, for engines on a `ManualBackend`
    ///
    /// Writes one interleaved window (`2 * window_length` samples) into
    /// `out`. Never blocks. On `ServiceOutcome::Contended` `out` is left as
    /// it was, so reusing the same buffer replays the previous window.
    pub fn service_hardware(&self, out: &mut [f32]) -> ServiceOutcome {
        self.handoff.service(out)
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        if let Err(e) = self.backend.stop() {
            log::error!("Failed to stop {} output: {}", self.backend.name(), e);
        }
        log::info!("Audio engine stopped");
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("handoff", &self.handoff)
            .finish()
    }
}

// A panicking effect poisons the mixer. The collection itself is still
// structurally sound, so keep going.
fn lock_mixer(mixer: &Mutex<Mixer>) -> MutexGuard<'_, Mixer> {
    mixer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_mix_pass(mixer: &Mutex<Mixer>, handoff: &Handoff, monitor: &LoadMonitor) {
    let start = monitor.start_measure();

    let mut mixer = lock_mixer(mixer);
    handoff.publish(mixer.mix());
    drop(mixer);

    monitor.end_measure(start);
}

struct MixWorker {
    running: Arc<AtomicBool>,
    handoff: Arc<Handoff>,
    handle: Option<JoinHandle<()>>,
}

impl MixWorker {
    fn spawn(
        mixer: Arc<Mutex<Mixer>>,
        handoff: Arc<Handoff>,
        monitor: LoadMonitor,
        period: Duration,
    ) -> EngineResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_flag = Arc::clone(&running);
        let worker_handoff = Arc::clone(&handoff);

        let handle = thread::Builder::new()
            .name("mix-worker".to_string())
            .spawn(move || {
                log::debug!("Mix worker started");
                while running_flag.load(Ordering::Acquire) {
                    // The timeout bounds how long a missed wake-up can delay shutdown
                    if worker_handoff.wait_for_request(period)
                        && running_flag.load(Ordering::Acquire)
                    {
                        run_mix_pass(&mixer, &worker_handoff, &monitor);
                    }
                }
                log::debug!("Mix worker stopped");
            })
            .map_err(|e| EngineError::Worker(e.to_string()))?;

        Ok(Self {
            running,
            handoff,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.handoff.wake();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Mix worker panicked");
            }
        }
    }
}

impl Drop for MixWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::effect::Gain;
    use std::time::Instant;

    fn manual_engine(window_length: usize) -> AudioEngine {
        AudioEngine::manual(EngineConfig::new(48000, window_length)).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = AudioEngine::manual(EngineConfig::new(48000, 0));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_sound_errors() {
        let engine = manual_engine(4);
        let id = engine.create_sound(&[0.5; 4]);
        engine.destroy_sound(id).unwrap();

        assert!(matches!(engine.play(id), Err(EngineError::UnknownSound(_))));
        assert!(matches!(
            engine.destroy_sound(id),
            Err(EngineError::UnknownSound(_))
        ));
        assert!(engine.with_sound(id, |s| s.is_playing()).is_err());
    }

    #[test]
    fn test_process_audio_only_when_requested() {
        let engine = manual_engine(2);
        assert!(engine.process_audio());
        // Nothing consumed the published buffer yet
        assert!(!engine.process_audio());

        let mut out = vec![0.0; 4];
        assert_eq!(engine.service_hardware(&mut out), ServiceOutcome::Fresh);
        assert!(engine.process_audio());
    }

    #[test]
    fn test_polled_playback_reaches_hardware() {
        let engine = manual_engine(2);
        let id = engine.create_sound(&[0.1, 0.2, 0.3, 0.4]);
        engine.play(id).unwrap();

        let mut out = vec![0.0; 4];
        engine.process_audio();
        engine.service_hardware(&mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);

        engine.process_audio();
        engine.service_hardware(&mut out);
        assert_eq!(out, vec![0.3, 0.3, 0.4, 0.4]);
    }

    #[test]
    fn test_post_effect_is_audible() {
        let engine = manual_engine(2);
        let id = engine.create_sound(&[0.25, 0.25]);
        engine.play(id).unwrap();
        engine.add_post_effect(Box::new(Gain::new(2.0)));

        let mut out = vec![0.0; 4];
        engine.process_audio();
        engine.service_hardware(&mut out);
        assert_eq!(out, vec![0.5; 4]);
        assert_eq!(engine.output_peak(), 0.5);
    }

    #[test]
    fn test_manual_engine_reports_connected() {
        let engine = manual_engine(2);
        assert_eq!(engine.device_status(), DeviceStatus::Connected);
        assert_eq!(engine.output_peak(), 0.0);
    }

    #[test]
    fn test_worker_mode_mixes_on_request() {
        let config = EngineConfig::new(48000, 2).with_mix_mode(MixMode::Worker);
        let engine = AudioEngine::manual(config).unwrap();
        let id = engine.create_sound(&[0.5, 0.5]);
        engine.play(id).unwrap();

        // Polling is a no-op while the worker owns mixing
        assert!(!engine.process_audio());

        let mut out = vec![0.0; 4];
        let deadline = Instant::now() + Duration::from_secs(2);
        while out != vec![0.5; 4] && Instant::now() < deadline {
            engine.service_hardware(&mut out);
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(out, vec![0.5; 4]);
        assert!(engine.handoff_stats().published() >= 1);
    }

    #[test]
    fn test_worker_stops_on_drop() {
        let config = EngineConfig::new(48000, 64).with_mix_mode(MixMode::Worker);
        let engine = AudioEngine::manual(config).unwrap();
        let start = Instant::now();
        drop(engine);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
